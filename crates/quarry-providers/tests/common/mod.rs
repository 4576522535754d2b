//! Shared fixture wiring the full platform over in-memory backends
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use quarry_application::chunking::Chunker;
use quarry_application::runtime::{AiHandles, RuntimeCapabilities};
use quarry_application::sync::SyncOrchestrator;
use quarry_domain::entities::{Document, ProviderConfig, ProviderSecrets, Source};
use quarry_domain::error::Result;
use quarry_domain::ports::{
    DocumentStore, OAuthExchanger, OAuthUserInfo, ProviderConfigStore, SecretBox, SourceStore,
    SyncStateStore, TokenResponse,
};
use quarry_domain::value_objects::{Change, DocumentMeta};
use quarry_infrastructure::crypto::AesGcmSecretBox;
use quarry_infrastructure::lock::InMemoryLock;
use quarry_infrastructure::queue::InMemoryTaskQueue;
use quarry_infrastructure::stores::{
    InMemoryChunkStore, InMemoryInstallationStore, InMemoryProviderConfigStore,
    InMemorySettingsStore, InMemorySourceStore, InMemorySyncStateStore,
};
use quarry_providers::connectors::{
    ConnectorRegistry, MemoryConnectorBuilder, RegistryConnectorFactory,
};
use quarry_providers::normalise::default_registry;
use quarry_providers::search::InMemorySearchEngine;

/// Document store wrapper firing a hook after every save
pub struct HookedDocumentStore {
    inner: quarry_infrastructure::stores::InMemoryDocumentStore,
    saves: AtomicU64,
    hook: Mutex<Option<Box<dyn Fn(u64) + Send + Sync>>>,
}

impl HookedDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: quarry_infrastructure::stores::InMemoryDocumentStore::new(),
            saves: AtomicU64::new(0),
            hook: Mutex::new(None),
        }
    }

    pub fn set_hook(&self, hook: Box<dyn Fn(u64) + Send + Sync>) {
        *self.hook.lock().unwrap() = Some(hook);
    }
}

#[async_trait]
impl DocumentStore for HookedDocumentStore {
    async fn save(&self, document: &Document) -> Result<bool> {
        let inserted = self.inner.save(document).await?;
        let count = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(count);
        }
        Ok(inserted)
    }
    async fn get(&self, id: &str) -> Result<Document> {
        self.inner.get(id).await
    }
    async fn get_by_external_id(&self, source_id: &str, external_id: &str) -> Result<Document> {
        self.inner.get_by_external_id(source_id, external_id).await
    }
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Document>> {
        self.inner.get_many(ids).await
    }
    async fn list_by_source(&self, source_id: &str) -> Result<Vec<Document>> {
        self.inner.list_by_source(source_id).await
    }
    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id).await
    }
    async fn delete_by_source(&self, source_id: &str) -> Result<u64> {
        self.inner.delete_by_source(source_id).await
    }
    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }
}

/// Scripted exchanger for the OAuth flow
pub struct ScriptedExchanger;

#[async_trait]
impl OAuthExchanger for ScriptedExchanger {
    async fn exchange_code(&self, _config: &ProviderConfig, code: &str) -> Result<TokenResponse> {
        if code != "c1" {
            return Err(quarry_domain::error::Error::unauthorized("bad code"));
        }
        Ok(TokenResponse {
            access_token: "a1".into(),
            refresh_token: Some("r1".into()),
            expires_in: Some(3600),
            scopes: vec!["repo".into()],
        })
    }
    async fn refresh(
        &self,
        _config: &ProviderConfig,
        _refresh_token: &str,
    ) -> Result<TokenResponse> {
        Ok(TokenResponse {
            access_token: "a2".into(),
            refresh_token: Some("r2".into()),
            expires_in: Some(3600),
            scopes: vec![],
        })
    }
    async fn fetch_user_info(
        &self,
        _config: &ProviderConfig,
        _access_token: &str,
    ) -> Result<OAuthUserInfo> {
        Ok(OAuthUserInfo {
            account_id: "u1".into(),
            email: Some("octocat@x".into()),
            name: Some("octocat".into()),
        })
    }
}

/// The whole platform wired over in-memory backends
pub struct TestPlatform {
    pub secret_box: Arc<dyn SecretBox>,
    pub installations: Arc<InMemoryInstallationStore>,
    pub provider_configs: Arc<InMemoryProviderConfigStore>,
    pub sources: Arc<InMemorySourceStore>,
    pub sync_states: Arc<InMemorySyncStateStore>,
    pub documents: Arc<HookedDocumentStore>,
    pub chunks: Arc<InMemoryChunkStore>,
    pub engine: Arc<InMemorySearchEngine>,
    pub queue: Arc<InMemoryTaskQueue>,
    pub lock: Arc<InMemoryLock>,
    pub settings: Arc<InMemorySettingsStore>,
    pub memory_builder: Arc<MemoryConnectorBuilder>,
    pub capabilities: Arc<RuntimeCapabilities>,
    pub ai: Arc<AiHandles>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl TestPlatform {
    pub fn new() -> Self {
        Self::with_builders(Vec::new())
    }

    /// Build the platform, registering extra connector builders next to
    /// the standard memory one
    pub fn with_builders(
        extra: Vec<Arc<dyn quarry_domain::ports::ConnectorBuilder>>,
    ) -> Self {
        let secret_box: Arc<dyn SecretBox> =
            Arc::new(AesGcmSecretBox::new(AesGcmSecretBox::generate_key()).unwrap());
        let installations = Arc::new(InMemoryInstallationStore::new(secret_box.clone()));
        let provider_configs = Arc::new(InMemoryProviderConfigStore::new(secret_box.clone()));
        let sources = Arc::new(InMemorySourceStore::new());
        let sync_states = Arc::new(InMemorySyncStateStore::new());
        let documents = Arc::new(HookedDocumentStore::new());
        let chunks = Arc::new(InMemoryChunkStore::new());
        let engine = Arc::new(InMemorySearchEngine::new());
        let queue = Arc::new(InMemoryTaskQueue::new());
        let lock = Arc::new(InMemoryLock::new());
        let settings = Arc::new(InMemorySettingsStore::new(secret_box.clone()));
        let capabilities = Arc::new(RuntimeCapabilities::default());
        let ai = Arc::new(AiHandles::new());

        let memory_builder = Arc::new(MemoryConnectorBuilder::new());
        let mut registry = ConnectorRegistry::new();
        registry.register(memory_builder.clone());
        for builder in extra {
            registry.register(builder);
        }
        let factory = Arc::new(RegistryConnectorFactory::new(
            Arc::new(registry),
            installations.clone(),
            provider_configs.clone(),
            Arc::new(ScriptedExchanger),
        ));

        let orchestrator = Arc::new(SyncOrchestrator::new(
            sources.clone(),
            sync_states.clone(),
            documents.clone(),
            chunks.clone(),
            engine.clone(),
            factory,
            lock.clone(),
            settings.clone(),
            Arc::new(default_registry()),
            Chunker::default(),
            capabilities.clone(),
            ai.clone(),
        ));

        Self {
            secret_box,
            installations,
            provider_configs,
            sources,
            sync_states,
            documents,
            chunks,
            engine,
            queue,
            lock,
            settings,
            memory_builder,
            capabilities,
            ai,
            orchestrator,
        }
    }

    /// Seed the OAuth app configuration for a provider
    pub async fn seed_provider_config(&self, provider_type: &str) {
        let now = Utc::now();
        self.provider_configs
            .save(&ProviderConfig {
                provider_type: provider_type.into(),
                secrets: ProviderSecrets {
                    client_id: "cid".into(),
                    client_secret: "cs".into(),
                    api_key: None,
                },
                auth_url: "https://provider.example/oauth/authorize".into(),
                token_url: "https://provider.example/oauth/token".into(),
                scopes: vec!["repo".into()],
                redirect_uri: "https://quarry.local/oauth/callback".into(),
                enabled: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    /// Create a source over an installation, with its idle sync state
    pub async fn seed_source(
        &self,
        id: &str,
        provider_type: &str,
        installation_id: &str,
        containers: Vec<String>,
    ) -> Source {
        let now = Utc::now();
        let source = Source {
            id: id.into(),
            team_id: "team1".into(),
            name: format!("source {}", id),
            provider_type: provider_type.into(),
            config: serde_json::json!({}),
            installation_id: installation_id.into(),
            selected_containers: containers,
            enabled: true,
            created_by: "usr1".into(),
            created_at: now,
            updated_at: now,
        };
        self.sources.save(&source).await.unwrap();
        self.sync_states
            .save(&quarry_domain::entities::SyncState::new(id))
            .await
            .unwrap();
        source
    }
}

pub fn added(external_id: &str, content: &str) -> Change {
    Change::Added {
        document: meta(external_id),
        content: content.into(),
    }
}

pub fn meta(external_id: &str) -> DocumentMeta {
    DocumentMeta {
        external_id: external_id.into(),
        path: format!("/docs/{}", external_id),
        title: external_id.into(),
        mime_type: "text/plain".into(),
        metadata: serde_json::json!({}),
        updated_at: Some(Utc::now()),
    }
}

/// Content long enough to split into exactly two chunks
pub fn two_chunk_content() -> String {
    "The quick brown fox jumps over the lazy dog. ".repeat(28)
}

#[allow(dead_code)]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
