//! Provider configuration entity
//!
//! The OAuth application (or API credentials) registered for a provider
//! type. One row per provider; many installations reference it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth app credentials for a provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Per-provider OAuth/application configuration, unique by `provider_type`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_type: String,
    /// Decrypted app credentials; never serialised with the row
    #[serde(skip)]
    pub secrets: ProviderSecrets,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderConfig {
    /// Secret-free view for callers outside the core
    pub fn summary(&self) -> ProviderConfigSummary {
        ProviderConfigSummary {
            provider_type: self.provider_type.clone(),
            auth_url: self.auth_url.clone(),
            token_url: self.token_url.clone(),
            scopes: self.scopes.clone(),
            redirect_uri: self.redirect_uri.clone(),
            enabled: self.enabled,
            client_id_set: !self.secrets.client_id.is_empty(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Secret-free provider configuration view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfigSummary {
    pub provider_type: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub enabled: bool,
    /// Whether an OAuth client id has been configured
    pub client_id_set: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
