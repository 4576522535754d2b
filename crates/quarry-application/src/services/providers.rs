//! Provider configuration service
//!
//! Admin CRUD for the OAuth apps behind each provider type. Client
//! secrets are write-only: they go in through upserts and come back
//! only as a `client_id_set` flag.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use quarry_domain::entities::{AuthContext, ProviderConfig, ProviderConfigSummary, ProviderSecrets};
use quarry_domain::error::{Error, ErrorKind, Result};
use quarry_domain::ports::ProviderConfigStore;

/// Upsert request for a provider's OAuth app
#[derive(Debug, Clone)]
pub struct UpsertProviderConfig {
    pub provider_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub api_key: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub enabled: bool,
}

pub struct ProviderService {
    configs: Arc<dyn ProviderConfigStore>,
}

impl ProviderService {
    pub fn new(configs: Arc<dyn ProviderConfigStore>) -> Self {
        Self { configs }
    }

    pub async fn list(&self, ctx: &AuthContext) -> Result<Vec<ProviderConfigSummary>> {
        ctx.require_member()?;
        let mut summaries: Vec<ProviderConfigSummary> = self
            .configs
            .list()
            .await?
            .iter()
            .map(ProviderConfig::summary)
            .collect();
        summaries.sort_by(|a, b| a.provider_type.cmp(&b.provider_type));
        Ok(summaries)
    }

    pub async fn get(&self, ctx: &AuthContext, provider_type: &str) -> Result<ProviderConfigSummary> {
        ctx.require_member()?;
        Ok(self.configs.get(provider_type).await?.summary())
    }

    /// Create or replace a provider's OAuth app configuration
    pub async fn upsert(
        &self,
        ctx: &AuthContext,
        req: UpsertProviderConfig,
    ) -> Result<ProviderConfigSummary> {
        ctx.require_admin()?;
        if req.provider_type.trim().is_empty() {
            return Err(Error::invalid_input("provider_type must not be empty"));
        }
        if req.client_id.is_empty() || req.client_secret.is_empty() {
            return Err(Error::invalid_input("client credentials must not be empty"));
        }
        for url in [&req.auth_url, &req.token_url] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::invalid_input(format!("invalid endpoint url {}", url)));
            }
        }

        let now = Utc::now();
        let created_at = match self.configs.get(&req.provider_type).await {
            Ok(existing) => existing.created_at,
            Err(e) if e.kind() == ErrorKind::NotFound => now,
            Err(e) => return Err(e),
        };
        let config = ProviderConfig {
            provider_type: req.provider_type,
            secrets: ProviderSecrets {
                client_id: req.client_id,
                client_secret: req.client_secret,
                api_key: req.api_key,
            },
            auth_url: req.auth_url,
            token_url: req.token_url,
            scopes: req.scopes,
            redirect_uri: req.redirect_uri,
            enabled: req.enabled,
            created_at,
            updated_at: now,
        };
        self.configs.save(&config).await?;
        info!(provider = %config.provider_type, "provider config saved");
        Ok(config.summary())
    }

    pub async fn set_enabled(
        &self,
        ctx: &AuthContext,
        provider_type: &str,
        enabled: bool,
    ) -> Result<ProviderConfigSummary> {
        ctx.require_admin()?;
        let mut config = self.configs.get(provider_type).await?;
        config.enabled = enabled;
        config.updated_at = Utc::now();
        self.configs.save(&config).await?;
        Ok(config.summary())
    }

    pub async fn delete(&self, ctx: &AuthContext, provider_type: &str) -> Result<()> {
        ctx.require_admin()?;
        self.configs.get(provider_type).await?;
        self.configs.delete(provider_type).await?;
        info!(provider = %provider_type, "provider config deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testsupport::*;

    fn request() -> UpsertProviderConfig {
        UpsertProviderConfig {
            provider_type: "github".into(),
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            api_key: None,
            auth_url: "https://github.com/login/oauth/authorize".into(),
            token_url: "https://github.com/login/oauth/access_token".into(),
            scopes: vec!["repo".into()],
            redirect_uri: "https://quarry.local/oauth/callback".into(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn upsert_masks_secrets() {
        let service = ProviderService::new(Arc::new(MemProviderConfigs::default()));
        let summary = service.upsert(&admin_ctx(), request()).await.unwrap();
        assert!(summary.client_id_set);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("csecret"));
        assert!(!json.contains("cid"));
    }

    #[tokio::test]
    async fn upsert_requires_admin() {
        let service = ProviderService::new(Arc::new(MemProviderConfigs::default()));
        assert_eq!(
            service
                .upsert(&member_ctx(), request())
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::Forbidden
        );
    }

    #[tokio::test]
    async fn upsert_preserves_created_at() {
        let service = ProviderService::new(Arc::new(MemProviderConfigs::default()));
        let first = service.upsert(&admin_ctx(), request()).await.unwrap();
        let second = service.upsert(&admin_ctx(), request()).await.unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }
}
