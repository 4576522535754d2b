//! Team settings and AI provider configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{DEFAULT_RESULTS_PER_PAGE, DEFAULT_SYNC_INTERVAL, MAX_RESULTS_PER_PAGE};
use crate::error::{Error, Result};

/// Per-team tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub team_id: String,
    pub results_per_page: usize,
    pub max_results_per_page: usize,
    /// Overrides the default lexical weight in hybrid fusion when set
    pub hybrid_lexical_weight: Option<f32>,
    pub sync_interval: Duration,
    pub session_ttl: Duration,
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    /// Defaults for a new team
    pub fn for_team(team_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
            max_results_per_page: MAX_RESULTS_PER_PAGE,
            hybrid_lexical_weight: None,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            session_ttl: Duration::from_secs(24 * 3600),
            updated_at: Utc::now(),
        }
    }
}

/// Supported AI providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    OpenAi,
    Anthropic,
    Ollama,
    Cohere,
    Voyage,
}

impl AiProvider {
    /// Parse a provider name as accepted by the settings API
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "cohere" => Ok(Self::Cohere),
            "voyage" => Ok(Self::Voyage),
            other => Err(Error::invalid_provider(other)),
        }
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
            Self::Cohere => "cohere",
            Self::Voyage => "voyage",
        }
    }

    /// Local providers authenticate by reachability, not API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Whether the provider exposes an embeddings endpoint
    pub fn supports_embedding(&self) -> bool {
        !matches!(self, Self::Anthropic)
    }
}

/// Connection settings for one AI provider role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiProviderConfig {
    pub provider: AiProvider,
    pub model: String,
    /// Decrypted API key; never serialised with the row
    #[serde(skip)]
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// AI configuration for a team: embedder and optional LLM
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiSettings {
    pub embedding: Option<AiProviderConfig>,
    pub llm: Option<AiProviderConfig>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AiSettings {
    /// Key-free view for callers outside the core
    pub fn summary(&self) -> AiSettingsSummary {
        let role = |cfg: &Option<AiProviderConfig>| {
            cfg.as_ref().map(|c| AiRoleSummary {
                provider: c.provider,
                model: c.model.clone(),
                base_url: c.base_url.clone(),
                api_key_set: c.api_key.is_some(),
            })
        };
        AiSettingsSummary {
            embedding: role(&self.embedding),
            llm: role(&self.llm),
            updated_at: self.updated_at,
        }
    }
}

/// Key-free view of one configured provider role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRoleSummary {
    pub provider: AiProvider,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key_set: bool,
}

/// Key-free AI settings view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSettingsSummary {
    pub embedding: Option<AiRoleSummary>,
    pub llm: Option<AiRoleSummary>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Outcome of applying new AI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSettingsStatus {
    pub embedding_available: bool,
    pub llm_available: bool,
    pub embedding_dim: Option<usize>,
    pub embedding_model: Option<String>,
    pub llm_model: Option<String>,
    /// The deployed schema can be upgraded to use the new embedder
    pub can_upgrade: bool,
    /// The embedding dimension changed; existing chunks need re-indexing
    pub reindex_required: bool,
}
