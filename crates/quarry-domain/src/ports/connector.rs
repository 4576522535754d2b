//! Connector ports
//!
//! The pluggable provider boundary. Builders are a closed set registered
//! at startup; a built connector is transient, owned by the orchestrator
//! for the duration of one sync, and must never mutate the source.

use async_trait::async_trait;

use crate::entities::Source;
use crate::error::Result;
use crate::value_objects::{Change, FetchedDocument};
use std::sync::Arc;

/// Credential access for a connector
///
/// Each call returns a currently-valid access token, transparently
/// refreshing OAuth tokens near expiry. Refresh is serialised per
/// installation and persists new tokens before returning.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;

    /// Discard cached state and refresh unconditionally
    ///
    /// Used once after a provider rejects a token mid-sync.
    async fn force_refresh(&self) -> Result<String>;
}

/// A batch of incremental changes plus the continuation token
#[derive(Debug, Clone, Default)]
pub struct ChangeBatch {
    pub changes: Vec<Change>,
    /// Opaque token; passing it back yields only events strictly after
    /// the last one in `changes`
    pub next_cursor: String,
}

/// One live connection to a provider container
#[async_trait]
pub trait Connector: Send + Sync {
    fn provider_type(&self) -> &str;

    /// Validate the source's provider-specific configuration
    fn validate_config(&self, source: &Source) -> Result<()>;

    async fn test_connection(&self) -> Result<()>;

    /// Fetch a single document by its provider-side id
    async fn fetch_document(&self, external_id: &str) -> Result<FetchedDocument>;

    /// Fetch events strictly after `cursor`; must terminate and return
    /// the next cursor even when nothing changed
    async fn fetch_changes(&self, source: &Source, cursor: Option<&str>) -> Result<ChangeBatch>;
}

/// Resolves a source into a live connector
///
/// Looks up the source's installation, wires a token provider around its
/// credentials and delegates to the registered builder.
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    async fn create(&self, source: &Source, container_id: &str) -> Result<Arc<dyn Connector>>;

    /// Build a connector straight from an installation, for connection
    /// tests that have no source yet
    async fn create_for_installation(
        &self,
        installation_id: &str,
        container_id: &str,
    ) -> Result<Arc<dyn Connector>>;

    /// Unconditionally refresh an installation's credentials
    ///
    /// Called once by the orchestrator after a provider rejects a token
    /// mid-sync; a second rejection is final.
    async fn force_refresh(&self, installation_id: &str) -> Result<()>;
}

/// OAuth endpoints and scopes a provider ships out of the box
#[derive(Debug, Clone)]
pub struct OAuthDefaults {
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

/// Startup-registered factory for one provider type
pub trait ConnectorBuilder: Send + Sync {
    fn provider_type(&self) -> &str;

    fn supports_oauth(&self) -> bool;

    /// Default OAuth endpoints, when the provider supports OAuth
    fn oauth_defaults(&self) -> Option<OAuthDefaults>;

    /// Whether sources may select individual containers
    fn supports_container_selection(&self) -> bool;

    /// Build a connector scoped to one container
    fn build(
        &self,
        token_provider: Arc<dyn TokenProvider>,
        container_id: &str,
    ) -> Result<Arc<dyn Connector>>;
}
