//! Settings service
//!
//! Team settings plus the AI provider configuration. Applying new AI
//! settings probes the provider before the runtime flags flip, so a
//! misconfigured provider never takes down a working one.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::runtime::{AiHandles, RuntimeCapabilities};
use quarry_domain::entities::{
    AiProviderConfig, AiSettings, AiSettingsStatus, AiSettingsSummary, AuthContext, SchemaMode,
    Settings,
};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{EmbeddingService, LlmService, SettingsStore, VespaConfigStore};

/// Builds provider clients from their configuration
///
/// Implemented by the provider layer; the service stays free of HTTP
/// concerns.
pub trait AiProviderFactory: Send + Sync {
    fn create_embedder(&self, config: &AiProviderConfig) -> Result<Arc<dyn EmbeddingService>>;
    fn create_llm(&self, config: &AiProviderConfig) -> Result<Arc<dyn LlmService>>;
}

/// Requested AI configuration; `None` clears the role
#[derive(Clone, Default)]
pub struct UpdateAiSettings {
    pub embedding: Option<AiProviderConfig>,
    pub llm: Option<AiProviderConfig>,
}

pub struct SettingsService {
    settings: Arc<dyn SettingsStore>,
    vespa_config: Arc<dyn VespaConfigStore>,
    factory: Arc<dyn AiProviderFactory>,
    capabilities: Arc<RuntimeCapabilities>,
    ai: Arc<AiHandles>,
}

impl SettingsService {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        vespa_config: Arc<dyn VespaConfigStore>,
        factory: Arc<dyn AiProviderFactory>,
        capabilities: Arc<RuntimeCapabilities>,
        ai: Arc<AiHandles>,
    ) -> Self {
        Self {
            settings,
            vespa_config,
            factory,
            capabilities,
            ai,
        }
    }

    pub async fn get(&self, ctx: &AuthContext) -> Result<Settings> {
        self.settings.get(&ctx.team_id).await
    }

    pub async fn update(&self, ctx: &AuthContext, mut settings: Settings) -> Result<Settings> {
        ctx.require_admin()?;
        if settings.results_per_page == 0 || settings.max_results_per_page == 0 {
            return Err(Error::invalid_input("page sizes must be positive"));
        }
        if settings.results_per_page > settings.max_results_per_page {
            return Err(Error::invalid_input(
                "results_per_page exceeds max_results_per_page",
            ));
        }
        if let Some(weight) = settings.hybrid_lexical_weight {
            if !(0.0..=1.0).contains(&weight) {
                return Err(Error::invalid_input("hybrid weight must be in [0, 1]"));
            }
        }
        settings.team_id = ctx.team_id.clone();
        settings.updated_at = Utc::now();
        self.settings.save(&settings).await?;
        Ok(settings)
    }

    pub async fn get_ai_settings(&self, ctx: &AuthContext) -> Result<AiSettingsSummary> {
        Ok(self.settings.get_ai(&ctx.team_id).await?.summary())
    }

    /// Current capability flags and upgrade hints
    pub async fn get_ai_status(&self, ctx: &AuthContext) -> Result<AiSettingsStatus> {
        let _ = ctx;
        let deployed = self.vespa_config.get().await?;
        let dim = self.capabilities.embedding_dim();
        Ok(AiSettingsStatus {
            embedding_available: self.capabilities.embedding_available(),
            llm_available: self.capabilities.llm_available(),
            embedding_dim: dim,
            embedding_model: self.ai.embedder().map(|e| e.model().to_string()),
            llm_model: self.ai.llm().map(|l| l.model().to_string()),
            can_upgrade: can_upgrade(&deployed.schema_mode, self.capabilities.embedding_available()),
            reindex_required: reindex_required(deployed.schema_mode, deployed.embedding_dim, dim),
        })
    }

    /// Probe a provider configuration without persisting anything
    pub async fn test_connection(
        &self,
        ctx: &AuthContext,
        config: &AiProviderConfig,
    ) -> Result<usize> {
        ctx.require_admin()?;
        validate_provider(config, true)?;
        let embedder = self.factory.create_embedder(config)?;
        let vector = embedder.embed_query("probe").await?;
        Ok(vector.len())
    }

    /// Apply new AI settings
    ///
    /// Persists first, then probes. A failing probe leaves the previous
    /// runtime service in place and surfaces the error; the persisted
    /// settings can be corrected and re-applied.
    pub async fn update_ai_settings(
        &self,
        ctx: &AuthContext,
        req: UpdateAiSettings,
    ) -> Result<AiSettingsStatus> {
        ctx.require_admin()?;
        if let Some(embedding) = &req.embedding {
            validate_provider(embedding, true)?;
        }
        if let Some(llm) = &req.llm {
            validate_provider(llm, false)?;
        }

        let ai = AiSettings {
            embedding: req.embedding.clone(),
            llm: req.llm.clone(),
            updated_at: Some(Utc::now()),
        };
        self.settings.save_ai(&ctx.team_id, &ai).await?;

        match &req.embedding {
            Some(config) => {
                let embedder = self.factory.create_embedder(config)?;
                let vector = embedder.embed_query("probe").await?;
                let dim = if vector.is_empty() {
                    embedder.dimensions()
                } else {
                    vector.len()
                };
                if dim == 0 {
                    return Err(Error::invalid_input("embedder reported zero dimensions"));
                }
                self.ai.set_embedder(Some(embedder));
                self.capabilities.set_embedding_dim(Some(dim));
                self.capabilities.set_embedding_available(true);
                info!(provider = config.provider.as_str(), dim, "embedder activated");
            }
            None => {
                self.ai.set_embedder(None);
                self.capabilities.set_embedding_available(false);
                self.capabilities.set_embedding_dim(None);
            }
        }

        match &req.llm {
            Some(config) => {
                let llm = self.factory.create_llm(config)?;
                if let Err(e) = llm.health_check().await {
                    // An unhealthy LLM does not block search; record and
                    // leave the flag down.
                    warn!(error = %e, "LLM probe failed");
                    self.ai.set_llm(None);
                    self.capabilities.set_llm_available(false);
                } else {
                    self.ai.set_llm(Some(llm));
                    self.capabilities.set_llm_available(true);
                }
            }
            None => {
                self.ai.set_llm(None);
                self.capabilities.set_llm_available(false);
            }
        }

        self.get_ai_status(ctx).await
    }
}

fn validate_provider(config: &AiProviderConfig, embedding_role: bool) -> Result<()> {
    if embedding_role && !config.provider.supports_embedding() {
        return Err(Error::invalid_provider(format!(
            "{} has no embeddings endpoint",
            config.provider.as_str()
        )));
    }
    if config.provider.requires_api_key() && config.api_key.as_deref().unwrap_or("").is_empty() {
        return Err(Error::invalid_input(format!(
            "{} requires an API key",
            config.provider.as_str()
        )));
    }
    if config.model.trim().is_empty() {
        return Err(Error::invalid_input("model must not be empty"));
    }
    Ok(())
}

fn can_upgrade(deployed: &SchemaMode, embedding_available: bool) -> bool {
    embedding_available && *deployed != SchemaMode::Hybrid
}

fn reindex_required(
    deployed: SchemaMode,
    deployed_dim: Option<usize>,
    active_dim: Option<usize>,
) -> bool {
    deployed == SchemaMode::Hybrid && active_dim.is_some() && deployed_dim != active_dim
}
