//! Engine schema administration
//!
//! Owns the schema lifecycle of the external engine: none to bm25 to
//! hybrid, strictly monotonic. Connect decides the target mode from the
//! runtime capabilities, merges or deploys the application package and
//! persists the outcome.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::runtime::{AiHandles, RuntimeCapabilities};
use quarry_domain::entities::{AuthContext, SchemaMode, VespaConfig, VespaStatus};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{ApplicationPackage, SearchEngine, VespaConfigStore, VespaDeployer};

/// Marker framing the chunk document type inside a schema file
const SCHEMA_BEGIN: &str = "schema chunk {";

pub struct VespaAdminService {
    config_store: Arc<dyn VespaConfigStore>,
    deployer: Arc<dyn VespaDeployer>,
    engine: Arc<dyn SearchEngine>,
    capabilities: Arc<RuntimeCapabilities>,
    ai: Arc<AiHandles>,
}

impl VespaAdminService {
    pub fn new(
        config_store: Arc<dyn VespaConfigStore>,
        deployer: Arc<dyn VespaDeployer>,
        engine: Arc<dyn SearchEngine>,
        capabilities: Arc<RuntimeCapabilities>,
        ai: Arc<AiHandles>,
    ) -> Self {
        Self {
            config_store,
            deployer,
            engine,
            capabilities,
            ai,
        }
    }

    /// Connect to the engine and bring the schema to the target mode
    ///
    /// The target is hybrid iff an embedder with a known dimension is
    /// available; an already-hybrid schema is never downgraded, whatever
    /// the current capabilities say.
    pub async fn connect(
        &self,
        ctx: &AuthContext,
        endpoint: &str,
        dev_mode: bool,
    ) -> Result<VespaStatus> {
        ctx.require_admin()?;
        if endpoint.trim().is_empty() {
            return Err(Error::invalid_input("endpoint must not be empty"));
        }

        let existing = self.config_store.get().await?;
        let (target_mode, target_dim) = self.target_mode(&existing);
        if !existing.schema_mode.can_transition_to(target_mode) {
            return Err(Error::internal(format!(
                "illegal schema transition {:?} -> {:?}",
                existing.schema_mode, target_mode
            )));
        }

        let our_schema = render_schema(target_mode, target_dim);
        let package = if dev_mode {
            // Dev mode ships the full embedded package
            ApplicationPackage {
                services_xml: SERVICES_XML.to_string(),
                schema: our_schema,
            }
        } else {
            // Production merges into whatever is already deployed
            let current = self.deployer.current_schema().await?;
            ApplicationPackage {
                services_xml: SERVICES_XML.to_string(),
                schema: merge_schema(current, our_schema),
            }
        };
        let outcome = self.deployer.deploy(&package).await?;

        let now = Utc::now();
        let config = VespaConfig {
            endpoint: endpoint.to_string(),
            connected: true,
            dev_mode,
            schema_mode: target_mode,
            embedding_dim: target_dim,
            embedding_provider: self.ai.embedder().map(|e| e.model().to_string()),
            schema_version: outcome.schema_version,
            cluster_info: outcome.cluster_info,
            created_at: existing.created_at,
            updated_at: now,
        };
        self.config_store.save(&config).await?;
        info!(mode = ?target_mode, dim = ?target_dim, version = config.schema_version,
            "engine schema deployed");
        self.status(ctx).await
    }

    pub async fn status(&self, ctx: &AuthContext) -> Result<VespaStatus> {
        let _ = ctx;
        let config = self.config_store.get().await?;
        let healthy = config.connected && self.deployer.health_check().await.is_ok();
        let indexed_chunks = if healthy {
            self.engine.indexed_chunks().await.unwrap_or(0)
        } else {
            0
        };
        let active_dim = self.capabilities.embedding_dim();
        Ok(VespaStatus {
            connected: config.connected,
            schema_mode: config.schema_mode,
            embedding_dim: config.embedding_dim,
            can_upgrade: self.capabilities.embedding_available()
                && config.schema_mode != SchemaMode::Hybrid,
            reindex_required: config.schema_mode == SchemaMode::Hybrid
                && active_dim.is_some()
                && config.embedding_dim != active_dim,
            healthy,
            indexed_chunks,
            cluster_info: config.cluster_info,
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        self.deployer
            .health_check()
            .await
            .map_err(|_| Error::service_unavailable("vespa"))
    }

    /// Decide the mode this connect should deploy
    fn target_mode(&self, existing: &VespaConfig) -> (SchemaMode, Option<usize>) {
        let dim = self.capabilities.embedding_dim().filter(|d| *d > 0);
        let embedding_ready = self.capabilities.embedding_available() && dim.is_some();

        if existing.schema_mode == SchemaMode::Hybrid {
            // Never downgrade; keep the deployed dimension when the
            // embedder went away, adopt the new one otherwise.
            return (SchemaMode::Hybrid, dim.or(existing.embedding_dim));
        }
        if embedding_ready {
            (SchemaMode::Hybrid, dim)
        } else {
            (SchemaMode::Bm25, None)
        }
    }
}

/// Render the chunk schema for a target mode
fn render_schema(mode: SchemaMode, dim: Option<usize>) -> String {
    let mut fields = String::from(
        "        field content type string {\n            indexing: index | summary\n            index: enable-bm25\n        }\n        field document_id type string {\n            indexing: attribute | summary\n        }\n        field source_id type string {\n            indexing: attribute | summary\n        }\n        field mime_type type string {\n            indexing: attribute | summary\n        }\n        field updated_at type long {\n            indexing: attribute | summary\n        }\n        field position type int {\n            indexing: attribute | summary\n        }\n",
    );
    if mode == SchemaMode::Hybrid {
        let dim = dim.unwrap_or(0);
        fields.push_str(&format!(
            "        field embedding type tensor<float>(x[{}]) {{\n            indexing: attribute | index\n            attribute {{\n                distance-metric: angular\n            }}\n        }}\n",
            dim
        ));
    }
    format!(
        "{}\n    document chunk {{\n{}    }}\n}}\n",
        SCHEMA_BEGIN, fields
    )
}

/// Merge our chunk schema into a deployed package's schema
///
/// Replaces an existing chunk document type wholesale; anything else in
/// the package is left untouched.
fn merge_schema(current: Option<String>, ours: String) -> String {
    match current {
        Some(current) if current.contains(SCHEMA_BEGIN) => {
            let start = current.find(SCHEMA_BEGIN).unwrap_or(0);
            // The schema block runs to the end of the file in packages
            // we deploy; keep whatever preceded it.
            format!("{}{}", &current[..start], ours)
        }
        Some(current) if !current.trim().is_empty() => format!("{}\n{}", current, ours),
        _ => ours,
    }
}

const SERVICES_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<services version="1.0">
    <container id="default" version="1.0">
        <search/>
        <document-api/>
    </container>
    <content id="chunks" version="1.0">
        <redundancy>1</redundancy>
        <documents>
            <document type="chunk" mode="index"/>
        </documents>
    </content>
</services>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testsupport::*;
    use async_trait::async_trait;
    use quarry_domain::ports::DeployOutcome;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockDeployer {
        version: AtomicU32,
        last_schema: Mutex<Option<String>>,
    }

    #[async_trait]
    impl VespaDeployer for MockDeployer {
        async fn current_schema(&self) -> Result<Option<String>> {
            Ok(self.last_schema.lock().unwrap().clone())
        }
        async fn deploy(&self, package: &ApplicationPackage) -> Result<DeployOutcome> {
            *self.last_schema.lock().unwrap() = Some(package.schema.clone());
            Ok(DeployOutcome {
                schema_version: self.version.fetch_add(1, Ordering::SeqCst) + 1,
                cluster_info: Some(serde_json::json!({"nodes": 1})),
            })
        }
        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn service() -> (VespaAdminService, Arc<RuntimeCapabilities>, Arc<MockDeployer>) {
        let capabilities = Arc::new(RuntimeCapabilities::default());
        let deployer = Arc::new(MockDeployer::default());
        (
            VespaAdminService::new(
                Arc::new(MemVespaConfig::default()),
                deployer.clone(),
                Arc::new(RecordingEngine::default()),
                capabilities.clone(),
                Arc::new(AiHandles::new()),
            ),
            capabilities,
            deployer,
        )
    }

    #[tokio::test]
    async fn connect_without_embedder_deploys_bm25() {
        let (service, _, deployer) = service();
        let status = service
            .connect(&admin_ctx(), "http://vespa:8080", true)
            .await
            .unwrap();
        assert_eq!(status.schema_mode, SchemaMode::Bm25);
        assert!(status.connected);
        assert!(!deployer
            .last_schema
            .lock()
            .unwrap()
            .as_ref()
            .unwrap()
            .contains("tensor"));
    }

    #[tokio::test]
    async fn embedder_upgrade_path_and_no_downgrade() {
        let (service, capabilities, deployer) = service();
        service
            .connect(&admin_ctx(), "http://vespa:8080", false)
            .await
            .unwrap();

        // Embedder appears: next connect upgrades to hybrid.
        capabilities.set_embedding_available(true);
        capabilities.set_embedding_dim(Some(1536));
        let status = service.status(&admin_ctx()).await.unwrap();
        assert!(status.can_upgrade);

        let upgraded = service
            .connect(&admin_ctx(), "http://vespa:8080", false)
            .await
            .unwrap();
        assert_eq!(upgraded.schema_mode, SchemaMode::Hybrid);
        assert_eq!(upgraded.embedding_dim, Some(1536));
        assert!(deployer
            .last_schema
            .lock()
            .unwrap()
            .as_ref()
            .unwrap()
            .contains("tensor<float>(x[1536])"));

        // Embedder goes away: hybrid must survive the next connect.
        capabilities.set_embedding_available(false);
        capabilities.set_embedding_dim(None);
        let still_hybrid = service
            .connect(&admin_ctx(), "http://vespa:8080", false)
            .await
            .unwrap();
        assert_eq!(still_hybrid.schema_mode, SchemaMode::Hybrid);
        assert_eq!(still_hybrid.embedding_dim, Some(1536));
    }

    #[tokio::test]
    async fn dimension_change_flags_reindex() {
        let (service, capabilities, _) = service();
        capabilities.set_embedding_available(true);
        capabilities.set_embedding_dim(Some(768));
        service
            .connect(&admin_ctx(), "http://vespa:8080", false)
            .await
            .unwrap();

        // Model swap changes the dimension.
        capabilities.set_embedding_dim(Some(1536));
        let status = service.status(&admin_ctx()).await.unwrap();
        assert!(status.reindex_required);
        assert_eq!(status.embedding_dim, Some(768));
    }

    #[tokio::test]
    async fn connect_requires_admin() {
        let (service, _, _) = service();
        assert!(service
            .connect(&member_ctx(), "http://vespa:8080", true)
            .await
            .is_err());
    }
}
