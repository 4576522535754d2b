//! Hand-written port mocks for service and pipeline tests
//!
//! Minimal in-memory implementations, just enough behaviour to drive the
//! services under test. The full-featured in-memory backends live in the
//! infrastructure crate; these stay deliberately small.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use quarry_domain::entities::*;
use quarry_domain::error::{Error, Result};
use quarry_domain::ids::new_id;
use quarry_domain::ports::*;
use quarry_domain::value_objects::*;

// ---------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct MemUsers(DashMap<String, User>);

#[async_trait]
impl UserStore for MemUsers {
    async fn save(&self, user: &User) -> Result<()> {
        self.0.insert(user.id.clone(), user.clone());
        Ok(())
    }
    async fn get(&self, id: &str) -> Result<User> {
        self.0
            .get(id)
            .map(|u| u.clone())
            .ok_or_else(|| Error::not_found(format!("user {}", id)))
    }
    async fn get_by_email(&self, email: &str) -> Result<User> {
        self.0
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.clone())
            .ok_or_else(|| Error::not_found(format!("user {}", email)))
    }
    async fn list(&self, team_id: &str) -> Result<Vec<User>> {
        Ok(self
            .0
            .iter()
            .filter(|u| u.team_id == team_id)
            .map(|u| u.clone())
            .collect())
    }
    async fn delete(&self, id: &str) -> Result<()> {
        self.0.remove(id);
        Ok(())
    }
    async fn count(&self) -> Result<u64> {
        Ok(self.0.len() as u64)
    }
}

#[derive(Default)]
pub struct MemSessions(DashMap<String, Session>);

#[async_trait]
impl SessionStore for MemSessions {
    async fn save(&self, session: &Session) -> Result<()> {
        self.0.insert(session.id.clone(), session.clone());
        Ok(())
    }
    async fn get(&self, id: &str) -> Result<Session> {
        self.0
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| Error::not_found(format!("session {}", id)))
    }
    async fn delete(&self, id: &str) -> Result<()> {
        self.0.remove(id);
        Ok(())
    }
    async fn delete_for_user(&self, user_id: &str) -> Result<u64> {
        let ids: Vec<String> = self
            .0
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.id.clone())
            .collect();
        let count = ids.len() as u64;
        for id in ids {
            self.0.remove(&id);
        }
        Ok(count)
    }
}

#[derive(Default)]
pub struct MemSettings {
    settings: DashMap<String, Settings>,
    ai: DashMap<String, AiSettings>,
}

#[async_trait]
impl SettingsStore for MemSettings {
    async fn save(&self, settings: &Settings) -> Result<()> {
        self.settings
            .insert(settings.team_id.clone(), settings.clone());
        Ok(())
    }
    async fn get(&self, team_id: &str) -> Result<Settings> {
        Ok(self
            .settings
            .get(team_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| Settings::for_team(team_id)))
    }
    async fn save_ai(&self, team_id: &str, ai: &AiSettings) -> Result<()> {
        self.ai.insert(team_id.to_string(), ai.clone());
        Ok(())
    }
    async fn get_ai(&self, team_id: &str) -> Result<AiSettings> {
        Ok(self.ai.get(team_id).map(|a| a.clone()).unwrap_or_default())
    }
}

/// Transparent auth adapter: hashes are prefixed plaintext, tokens are
/// the serialised context
pub struct MockAuthAdapter;

impl AuthAdapter for MockAuthAdapter {
    fn hash_password(&self, password: &str) -> Result<String> {
        Ok(format!("h:{}", password))
    }
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        Ok(hash == format!("h:{}", password))
    }
    fn generate_token(&self, ctx: &AuthContext, _ttl: Duration) -> Result<String> {
        Ok(serde_json::to_string(ctx)?)
    }
    fn parse_token(&self, token: &str) -> Result<AuthContext> {
        serde_json::from_str(token).map_err(|_| Error::token_invalid("malformed"))
    }
}

pub fn mock_auth_adapter() -> Arc<dyn AuthAdapter> {
    Arc::new(MockAuthAdapter)
}

pub fn stores() -> (Arc<MemUsers>, Arc<MemSessions>, Arc<MemSettings>) {
    (
        Arc::new(MemUsers::default()),
        Arc::new(MemSessions::default()),
        Arc::new(MemSettings::default()),
    )
}

pub async fn seed_user(users: &Arc<MemUsers>, email: &str, password: &str, role: Role) -> User {
    let now = Utc::now();
    let user = User {
        id: new_id(),
        email: email.into(),
        name: email.split('@').next().unwrap_or("user").into(),
        password_hash: format!("h:{}", password),
        role,
        team_id: "team1".into(),
        created_at: now,
        updated_at: now,
    };
    users.save(&user).await.unwrap();
    user
}

pub fn admin_ctx() -> AuthContext {
    AuthContext {
        user_id: "usr-admin".into(),
        email: "admin@quarry.dev".into(),
        role: Role::Admin,
        team_id: "team1".into(),
        session_id: "ses1".into(),
    }
}

pub fn member_ctx() -> AuthContext {
    AuthContext {
        role: Role::Member,
        user_id: "usr-member".into(),
        ..admin_ctx()
    }
}

// ---------------------------------------------------------------------
// Connect layer
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct MemInstallations(pub DashMap<String, Installation>);

#[async_trait]
impl InstallationStore for MemInstallations {
    async fn save(&self, installation: &Installation) -> Result<()> {
        self.0.insert(installation.id.clone(), installation.clone());
        Ok(())
    }
    async fn get(&self, id: &str) -> Result<Installation> {
        self.0
            .get(id)
            .map(|i| i.clone())
            .ok_or_else(|| Error::not_found(format!("installation {}", id)))
    }
    async fn get_by_account_id(&self, provider: &str, account_id: &str) -> Result<Installation> {
        self.0
            .iter()
            .find(|i| i.provider_type == provider && i.account_id == account_id)
            .map(|i| i.clone())
            .ok_or_else(|| Error::not_found(format!("installation {}/{}", provider, account_id)))
    }
    async fn get_by_provider(&self, provider: &str) -> Result<Vec<Installation>> {
        Ok(self
            .0
            .iter()
            .filter(|i| i.provider_type == provider)
            .map(|i| i.clone())
            .collect())
    }
    async fn list(&self) -> Result<Vec<InstallationSummary>> {
        Ok(self.0.iter().map(|i| i.summary()).collect())
    }
    async fn update_secrets(
        &self,
        id: &str,
        secrets: &InstallationSecrets,
        oauth_expiry: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut row = self
            .0
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("installation {}", id)))?;
        row.secrets = secrets.clone();
        row.oauth_expiry = oauth_expiry;
        Ok(())
    }
    async fn update_last_used(&self, id: &str) -> Result<()> {
        if let Some(mut row) = self.0.get_mut(id) {
            row.last_used_at = Some(Utc::now());
        }
        Ok(())
    }
    async fn delete(&self, id: &str) -> Result<()> {
        self.0.remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemProviderConfigs(pub DashMap<String, ProviderConfig>);

#[async_trait]
impl ProviderConfigStore for MemProviderConfigs {
    async fn save(&self, config: &ProviderConfig) -> Result<()> {
        self.0.insert(config.provider_type.clone(), config.clone());
        Ok(())
    }
    async fn get(&self, provider_type: &str) -> Result<ProviderConfig> {
        self.0
            .get(provider_type)
            .map(|c| c.clone())
            .ok_or_else(|| Error::not_found(format!("provider config {}", provider_type)))
    }
    async fn list(&self) -> Result<Vec<ProviderConfig>> {
        Ok(self.0.iter().map(|c| c.clone()).collect())
    }
    async fn delete(&self, provider_type: &str) -> Result<()> {
        self.0.remove(provider_type);
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Content layer
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct MemSources(pub DashMap<String, Source>);

#[async_trait]
impl SourceStore for MemSources {
    async fn save(&self, source: &Source) -> Result<()> {
        self.0.insert(source.id.clone(), source.clone());
        Ok(())
    }
    async fn get(&self, id: &str) -> Result<Source> {
        self.0
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| Error::not_found(format!("source {}", id)))
    }
    async fn get_by_name(&self, team_id: &str, name: &str) -> Result<Source> {
        self.0
            .iter()
            .find(|s| s.team_id == team_id && s.name == name)
            .map(|s| s.clone())
            .ok_or_else(|| Error::not_found(format!("source {}", name)))
    }
    async fn list(&self, team_id: &str) -> Result<Vec<Source>> {
        Ok(self
            .0
            .iter()
            .filter(|s| s.team_id == team_id)
            .map(|s| s.clone())
            .collect())
    }
    async fn delete(&self, id: &str) -> Result<()> {
        self.0.remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemSyncStates(pub DashMap<String, SyncState>);

#[async_trait]
impl SyncStateStore for MemSyncStates {
    async fn save(&self, state: &SyncState) -> Result<()> {
        self.0.insert(state.source_id.clone(), state.clone());
        Ok(())
    }
    async fn get(&self, source_id: &str) -> Result<SyncState> {
        self.0
            .get(source_id)
            .map(|s| s.clone())
            .ok_or_else(|| Error::not_found(format!("sync state {}", source_id)))
    }
    async fn list(&self) -> Result<Vec<SyncState>> {
        Ok(self.0.iter().map(|s| s.clone()).collect())
    }
    async fn delete(&self, source_id: &str) -> Result<()> {
        self.0.remove(source_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemDocuments(pub DashMap<String, Document>);

#[async_trait]
impl DocumentStore for MemDocuments {
    async fn save(&self, document: &Document) -> Result<bool> {
        let existing = self
            .0
            .iter()
            .find(|d| d.source_id == document.source_id && d.external_id == document.external_id)
            .map(|d| d.id.clone());
        match existing {
            Some(id) => {
                let mut updated = document.clone();
                updated.id = id.clone();
                self.0.insert(id, updated);
                Ok(false)
            }
            None => {
                self.0.insert(document.id.clone(), document.clone());
                Ok(true)
            }
        }
    }
    async fn get(&self, id: &str) -> Result<Document> {
        self.0
            .get(id)
            .map(|d| d.clone())
            .ok_or_else(|| Error::not_found(format!("document {}", id)))
    }
    async fn get_by_external_id(&self, source_id: &str, external_id: &str) -> Result<Document> {
        self.0
            .iter()
            .find(|d| d.source_id == source_id && d.external_id == external_id)
            .map(|d| d.clone())
            .ok_or_else(|| Error::not_found(format!("document {}", external_id)))
    }
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Document>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.0.get(id).map(|d| d.clone()))
            .collect())
    }
    async fn list_by_source(&self, source_id: &str) -> Result<Vec<Document>> {
        Ok(self
            .0
            .iter()
            .filter(|d| d.source_id == source_id)
            .map(|d| d.clone())
            .collect())
    }
    async fn delete(&self, id: &str) -> Result<()> {
        self.0.remove(id);
        Ok(())
    }
    async fn delete_by_source(&self, source_id: &str) -> Result<u64> {
        let ids: Vec<String> = self
            .0
            .iter()
            .filter(|d| d.source_id == source_id)
            .map(|d| d.id.clone())
            .collect();
        let count = ids.len() as u64;
        for id in ids {
            self.0.remove(&id);
        }
        Ok(count)
    }
    async fn count(&self) -> Result<u64> {
        Ok(self.0.len() as u64)
    }
}

#[derive(Default)]
pub struct MemChunks(pub DashMap<String, Vec<Chunk>>);

#[async_trait]
impl ChunkStore for MemChunks {
    async fn save_batch(&self, document_id: &str, chunks: &[Chunk]) -> Result<()> {
        self.0.insert(document_id.to_string(), chunks.to_vec());
        Ok(())
    }
    async fn get_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        Ok(self
            .0
            .get(document_id)
            .map(|c| c.clone())
            .unwrap_or_default())
    }
    async fn delete_by_document(&self, document_id: &str) -> Result<u64> {
        Ok(self
            .0
            .remove(document_id)
            .map(|(_, chunks)| chunks.len() as u64)
            .unwrap_or(0))
    }
    async fn delete_by_source(&self, source_id: &str) -> Result<u64> {
        let ids: Vec<String> = self
            .0
            .iter()
            .filter(|entry| entry.value().iter().any(|c| c.source_id == source_id))
            .map(|entry| entry.key().clone())
            .collect();
        let mut count = 0;
        for id in ids {
            if let Some((_, chunks)) = self.0.remove(&id) {
                count += chunks.len() as u64;
            }
        }
        Ok(count)
    }
    async fn count(&self) -> Result<u64> {
        Ok(self.0.iter().map(|c| c.len() as u64).sum())
    }
}

#[derive(Default)]
pub struct MemVespaConfig(Mutex<Option<VespaConfig>>);

#[async_trait]
impl VespaConfigStore for MemVespaConfig {
    async fn save(&self, config: &VespaConfig) -> Result<()> {
        *self.0.lock().unwrap() = Some(config.clone());
        Ok(())
    }
    async fn get(&self) -> Result<VespaConfig> {
        Ok(self.0.lock().unwrap().clone().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemSchedules(pub DashMap<String, ScheduledTask>);

#[async_trait]
impl ScheduleStore for MemSchedules {
    async fn save(&self, task: &ScheduledTask) -> Result<()> {
        self.0.insert(task.id.clone(), task.clone());
        Ok(())
    }
    async fn get(&self, id: &str) -> Result<ScheduledTask> {
        self.0
            .get(id)
            .map(|t| t.clone())
            .ok_or_else(|| Error::not_found(format!("schedule {}", id)))
    }
    async fn list(&self) -> Result<Vec<ScheduledTask>> {
        Ok(self.0.iter().map(|t| t.clone()).collect())
    }
    async fn update_next_run(
        &self,
        id: &str,
        last_run: DateTime<Utc>,
        next_run: DateTime<Utc>,
    ) -> Result<()> {
        let mut row = self
            .0
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("schedule {}", id)))?;
        row.last_run = Some(last_run);
        row.next_run = next_run;
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Queue and lock
// ---------------------------------------------------------------------

/// FIFO-with-readiness task queue, no lease reclaim
#[derive(Default)]
pub struct MemQueue {
    pending: Mutex<VecDeque<Task>>,
    pub terminal: DashMap<String, Task>,
}

#[async_trait]
impl TaskQueue for MemQueue {
    async fn enqueue(&self, task: Task) -> Result<()> {
        self.pending.lock().unwrap().push_back(task);
        Ok(())
    }
    async fn enqueue_batch(&self, tasks: Vec<Task>) -> Result<()> {
        self.pending.lock().unwrap().extend(tasks);
        Ok(())
    }
    async fn dequeue(&self) -> Result<Task> {
        match self.dequeue_with_timeout(Duration::from_millis(50)).await? {
            Some(task) => Ok(task),
            None => Err(Error::internal("queue drained")),
        }
    }
    async fn dequeue_with_timeout(&self, _timeout: Duration) -> Result<Option<Task>> {
        let now = Utc::now();
        let mut pending = self.pending.lock().unwrap();
        let idx = pending.iter().position(|t| t.is_ready(now));
        Ok(idx.and_then(|i| pending.remove(i)).map(|mut task| {
            task.status = TaskStatus::Processing;
            task.attempts += 1;
            task.started_at = Some(now);
            self.terminal.insert(task.id.clone(), task.clone());
            task
        }))
    }
    async fn ack(&self, id: &str) -> Result<()> {
        if let Some(mut task) = self.terminal.get_mut(id) {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Utc::now());
            task.error = None;
        }
        Ok(())
    }
    async fn nack(&self, id: &str, reason: &str) -> Result<()> {
        let mut task = match self.terminal.get(id) {
            Some(t) => t.clone(),
            None => return Ok(()),
        };
        task.error = Some(reason.to_string());
        if task.can_retry() {
            task.status = TaskStatus::Pending;
            task.scheduled_for = Utc::now()
                + chrono::Duration::from_std(Task::retry_backoff(task.attempts))
                    .unwrap_or_else(|_| chrono::Duration::zero());
            self.terminal.remove(id);
            self.pending.lock().unwrap().push_back(task);
        } else {
            task.status = TaskStatus::Failed;
            self.terminal.insert(task.id.clone(), task);
        }
        Ok(())
    }
    async fn cancel_task(&self, id: &str) -> Result<()> {
        self.pending.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }
    async fn purge_tasks(&self, _older_than: DateTime<Utc>) -> Result<u64> {
        Ok(0)
    }
    async fn get_task(&self, id: &str) -> Result<Task> {
        if let Some(task) = self.terminal.get(id) {
            return Ok(task.clone());
        }
        self.pending
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("task {}", id)))
    }
    async fn list_tasks(&self, _filter: TaskFilter) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self.pending.lock().unwrap().iter().cloned().collect();
        tasks.extend(self.terminal.iter().map(|t| t.clone()));
        Ok(tasks)
    }
    async fn stats(&self) -> Result<QueueStats> {
        Ok(QueueStats {
            pending: self.pending.lock().unwrap().len() as u64,
            ..Default::default()
        })
    }
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Contention-honouring lock; TTL expiry is not simulated
#[derive(Default)]
pub struct MemLock(DashMap<String, String>);

#[async_trait]
impl DistributedLock for MemLock {
    async fn acquire(&self, name: &str, _ttl: Duration) -> Result<Option<LockLease>> {
        let token = new_id();
        match self.0.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(None),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(token.clone());
                Ok(Some(LockLease {
                    name: name.to_string(),
                    token,
                }))
            }
        }
    }
    async fn release(&self, lease: &LockLease) -> Result<()> {
        self.0
            .remove_if(&lease.name, |_, token| *token == lease.token);
        Ok(())
    }
    async fn extend(&self, _lease: &LockLease, _ttl: Duration) -> Result<()> {
        Ok(())
    }
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------
// AI and engine
// ---------------------------------------------------------------------

/// Deterministic embedder; flip `fail` to simulate provider outage
pub struct MockEmbedder {
    pub dim: usize,
    pub fail: AtomicBool,
    pub calls: AtomicU64,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            fail: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingService for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::retryable("embedder offline"));
        }
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0; self.dim];
                v[0] = t.len() as f32;
                v
            })
            .collect())
    }
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[query.to_string()]).await?;
        Ok(vectors.remove(0))
    }
    fn dimensions(&self) -> usize {
        self.dim
    }
    fn model(&self) -> &str {
        "mock-embedder"
    }
    async fn health_check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::service_unavailable("mock embedder"));
        }
        Ok(())
    }
}

/// Engine mock recording writes; search replays a scripted response
#[derive(Default)]
pub struct RecordingEngine {
    pub indexed: DashMap<String, Chunk>,
    pub scripted_hits: Mutex<Vec<ScoredChunk>>,
    pub reject_embedding_modes: AtomicBool,
}

#[async_trait]
impl SearchEngine for RecordingEngine {
    async fn index(&self, _document: &Document, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            self.indexed.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }
    async fn search(
        &self,
        _query: &str,
        query_embedding: Option<&[f32]>,
        opts: &SearchOptions,
    ) -> Result<SearchHits> {
        if opts.mode.requires_embedding() {
            if self.reject_embedding_modes.load(Ordering::SeqCst) {
                return Err(Error::invalid_input("schema is lexical-only"));
            }
            if query_embedding.is_none() {
                return Err(Error::invalid_input("query embedding required"));
            }
        }
        let hits: Vec<ScoredChunk> = self.scripted_hits.lock().unwrap().clone();
        let total = hits.len() as u64;
        Ok(SearchHits {
            hits: hits
                .into_iter()
                .skip(opts.offset)
                .take(opts.limit)
                .collect(),
            total,
        })
    }
    async fn delete(&self, chunk_ids: &[String]) -> Result<()> {
        for id in chunk_ids {
            self.indexed.remove(id);
        }
        Ok(())
    }
    async fn delete_by_document(&self, document_id: &str) -> Result<()> {
        self.indexed.retain(|_, c| c.document_id != document_id);
        Ok(())
    }
    async fn delete_by_source(&self, source_id: &str) -> Result<()> {
        self.indexed.retain(|_, c| c.source_id != source_id);
        Ok(())
    }
    async fn indexed_chunks(&self) -> Result<u64> {
        Ok(self.indexed.len() as u64)
    }
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Connectors
// ---------------------------------------------------------------------

/// Scripted connector: pops one change batch per fetch
pub struct ScriptedConnector {
    pub batches: Mutex<VecDeque<Result<ChangeBatch>>>,
}

impl ScriptedConnector {
    pub fn new(batches: Vec<Result<ChangeBatch>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn provider_type(&self) -> &str {
        "scripted"
    }
    fn validate_config(&self, _source: &Source) -> Result<()> {
        Ok(())
    }
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }
    async fn fetch_document(&self, external_id: &str) -> Result<FetchedDocument> {
        Err(Error::not_found(format!("document {}", external_id)))
    }
    async fn fetch_changes(&self, _source: &Source, cursor: Option<&str>) -> Result<ChangeBatch> {
        match self.batches.lock().unwrap().pop_front() {
            Some(batch) => batch,
            // Upstream quiet: nothing new, cursor unchanged
            None => Ok(ChangeBatch {
                changes: vec![],
                next_cursor: cursor.unwrap_or_default().to_string(),
            }),
        }
    }
}

/// Factory handing out pre-built connectors per source id
#[derive(Default)]
pub struct ScriptedFactory {
    pub connectors: DashMap<String, Arc<dyn Connector>>,
    pub errors: DashMap<String, ErrorFactory>,
}

pub type ErrorFactory = fn() -> Error;

#[async_trait]
impl ConnectorFactory for ScriptedFactory {
    async fn create(&self, source: &Source, _container_id: &str) -> Result<Arc<dyn Connector>> {
        if let Some(make) = self.errors.get(&source.id) {
            return Err(make());
        }
        self.connectors
            .get(&source.id)
            .map(|c| c.clone())
            .ok_or_else(|| Error::connector_not_found(&source.provider_type))
    }

    async fn create_for_installation(
        &self,
        installation_id: &str,
        _container_id: &str,
    ) -> Result<Arc<dyn Connector>> {
        self.connectors
            .get(installation_id)
            .map(|c| c.clone())
            .ok_or_else(|| Error::connector_not_found(installation_id))
    }

    async fn force_refresh(&self, _installation_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Convenience change constructors for tests
pub fn added(external_id: &str, content: &str) -> Change {
    Change::Added {
        document: doc_meta(external_id),
        content: content.to_string(),
    }
}

pub fn modified(external_id: &str, content: &str) -> Change {
    Change::Modified {
        document: doc_meta(external_id),
        content: content.to_string(),
    }
}

pub fn deleted(external_id: &str) -> Change {
    Change::Deleted {
        external_id: external_id.to_string(),
    }
}

fn doc_meta(external_id: &str) -> DocumentMeta {
    DocumentMeta {
        external_id: external_id.to_string(),
        path: format!("/docs/{}", external_id),
        title: external_id.to_string(),
        mime_type: "text/plain".to_string(),
        metadata: serde_json::json!({}),
        updated_at: Some(Utc::now()),
    }
}

pub fn test_source(id: &str, containers: Vec<String>) -> Source {
    let now = Utc::now();
    Source {
        id: id.to_string(),
        team_id: "team1".into(),
        name: format!("source {}", id),
        provider_type: "scripted".into(),
        config: serde_json::json!({}),
        installation_id: "ins1".into(),
        selected_containers: containers,
        enabled: true,
        created_by: "usr1".into(),
        created_at: now,
        updated_at: now,
    }
}
