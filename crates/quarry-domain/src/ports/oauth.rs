//! OAuth ports
//!
//! The coordinator drives the authorization-code flow through these two
//! seams: an HTTP exchanger talking to the provider and a short-lived
//! state store whose consume is atomic, making each state single-use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::entities::ProviderConfig;
use crate::error::Result;

/// Token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, when the provider reports one
    pub expires_in: Option<u64>,
    pub scopes: Vec<String>,
}

/// Identity of the account that authorized us
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthUserInfo {
    pub account_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Provider-side HTTP operations of the code flow
#[async_trait]
pub trait OAuthExchanger: Send + Sync {
    /// Exchange an authorization code for tokens
    async fn exchange_code(&self, config: &ProviderConfig, code: &str) -> Result<TokenResponse>;

    /// Refresh an access token
    async fn refresh(&self, config: &ProviderConfig, refresh_token: &str)
        -> Result<TokenResponse>;

    /// Fetch the authorizing account's identity
    async fn fetch_user_info(
        &self,
        config: &ProviderConfig,
        access_token: &str,
    ) -> Result<OAuthUserInfo>;
}

/// Pending authorization attempt keyed by its CSRF state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthStateData {
    pub provider_type: String,
    pub installation_name: Option<String>,
    pub redirect_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Short-lived, single-use state storage
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    async fn put(&self, state: &str, data: OAuthStateData, ttl: Duration) -> Result<()>;

    /// Atomically read and delete; a second consume of the same state
    /// returns `None`
    async fn consume(&self, state: &str) -> Result<Option<OAuthStateData>>;
}
