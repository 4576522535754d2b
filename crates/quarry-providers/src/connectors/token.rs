//! Token provider
//!
//! Hands connectors a valid credential on every call. OAuth tokens
//! close to expiry are refreshed first; refresh for one installation is
//! serialised through a shared gate so concurrent connectors cannot
//! double-spend a refresh token. New tokens are persisted before the
//! refreshed value is returned.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use quarry_domain::entities::{AuthMethod, Installation, InstallationSecrets};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{
    InstallationStore, OAuthExchanger, ProviderConfigStore, TokenProvider,
};

pub struct OAuthTokenProvider {
    installation_id: String,
    installations: Arc<dyn InstallationStore>,
    configs: Arc<dyn ProviderConfigStore>,
    exchanger: Arc<dyn OAuthExchanger>,
    /// Shared per-installation refresh gate, owned by the factory
    refresh_gate: Arc<Mutex<()>>,
}

impl OAuthTokenProvider {
    pub fn new(
        installation_id: impl Into<String>,
        installations: Arc<dyn InstallationStore>,
        configs: Arc<dyn ProviderConfigStore>,
        exchanger: Arc<dyn OAuthExchanger>,
        refresh_gate: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            installation_id: installation_id.into(),
            installations,
            configs,
            exchanger,
            refresh_gate,
        }
    }

    fn static_credential(installation: &Installation) -> Result<String> {
        let secrets = &installation.secrets;
        match installation.auth_method {
            AuthMethod::ApiKey => secrets
                .api_key
                .clone()
                .ok_or_else(|| Error::unauthorized("installation has no API key")),
            AuthMethod::Pat | AuthMethod::OAuth2 => secrets
                .access_token
                .clone()
                .ok_or_else(|| Error::unauthorized("installation has no access token")),
            AuthMethod::Basic => match (&secrets.username, &secrets.password) {
                (Some(user), Some(pass)) => Ok(general_purpose::STANDARD
                    .encode(format!("{}:{}", user, pass))),
                _ => Err(Error::unauthorized("installation has no basic credentials")),
            },
            AuthMethod::ServiceAccount => secrets
                .service_account_json
                .clone()
                .ok_or_else(|| Error::unauthorized("installation has no service account")),
        }
    }

    /// Refresh the OAuth token, serialised per installation
    async fn refresh(&self, force: bool) -> Result<String> {
        let _gate = self.refresh_gate.lock().await;

        // Re-read under the gate: a concurrent caller may already have
        // refreshed while we waited.
        let installation = self.installations.get(&self.installation_id).await?;
        if !force && !installation.needs_refresh(Utc::now()) {
            return Self::static_credential(&installation);
        }

        let refresh_token = installation
            .secrets
            .refresh_token
            .clone()
            .ok_or(Error::TokenExpired)?;
        let config = self.configs.get(&installation.provider_type).await?;
        let tokens = self.exchanger.refresh(&config, &refresh_token).await?;

        let secrets = InstallationSecrets {
            access_token: Some(tokens.access_token.clone()),
            // Providers may rotate the refresh token or keep the old one
            refresh_token: tokens.refresh_token.clone().or(Some(refresh_token)),
            ..installation.secrets.clone()
        };
        let expiry = tokens
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs as i64));

        // Persist before returning so a crash cannot lose the rotation
        self.installations
            .update_secrets(&self.installation_id, &secrets, expiry)
            .await?;
        info!(installation_id = %self.installation_id, "oauth token refreshed");
        Ok(tokens.access_token)
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let installation = self.installations.get(&self.installation_id).await?;
        if installation.auth_method == AuthMethod::OAuth2
            && installation.needs_refresh(Utc::now())
        {
            debug!(installation_id = %self.installation_id, "token near expiry, refreshing");
            return self.refresh(false).await;
        }
        Self::static_credential(&installation)
    }

    async fn force_refresh(&self) -> Result<String> {
        self.refresh(true).await
    }
}
