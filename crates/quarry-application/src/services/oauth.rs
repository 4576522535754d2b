//! OAuth coordinator
//!
//! Drives the authorization-code flow for every OAuth-capable provider.
//! Each attempt is tracked by a cryptographically random, single-use
//! state token; the callback exchanges the code, resolves the account
//! identity and creates or refreshes the matching installation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use quarry_domain::constants::OAUTH_STATE_TTL;
use quarry_domain::entities::{
    AuthContext, AuthMethod, Installation, InstallationSecrets, InstallationSummary,
};
use quarry_domain::error::{Error, ErrorKind, Result};
use quarry_domain::ids::new_id;
use quarry_domain::ports::{
    InstallationStore, OAuthExchanger, OAuthStateData, OAuthStateStore, ProviderConfigStore,
    TokenResponse,
};

/// A started authorization attempt
#[derive(Debug, Clone)]
pub struct AuthorizeOutcome {
    pub auth_url: String,
    pub state: String,
    pub expires_at: chrono::DateTime<Utc>,
}

pub struct OAuthCoordinator {
    configs: Arc<dyn ProviderConfigStore>,
    installations: Arc<dyn InstallationStore>,
    states: Arc<dyn OAuthStateStore>,
    exchanger: Arc<dyn OAuthExchanger>,
}

impl OAuthCoordinator {
    pub fn new(
        configs: Arc<dyn ProviderConfigStore>,
        installations: Arc<dyn InstallationStore>,
        states: Arc<dyn OAuthStateStore>,
        exchanger: Arc<dyn OAuthExchanger>,
    ) -> Self {
        Self {
            configs,
            installations,
            states,
            exchanger,
        }
    }

    /// Begin an authorization attempt and build the provider URL
    pub async fn authorize(
        &self,
        ctx: &AuthContext,
        provider_type: &str,
        installation_name: Option<String>,
        redirect_base: &str,
    ) -> Result<AuthorizeOutcome> {
        ctx.require_admin()?;
        let config = match self.configs.get(provider_type).await {
            Ok(config) => config,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::invalid_provider(provider_type));
            }
            Err(e) => return Err(e),
        };
        if !config.enabled {
            return Err(Error::invalid_provider(format!(
                "{} is disabled",
                provider_type
            )));
        }

        // 128 bits of randomness; single-use via atomic consume
        let state = new_id();
        let expires_at = Utc::now()
            + Duration::from_std(OAUTH_STATE_TTL).unwrap_or_else(|_| Duration::minutes(10));
        let redirect_url = format!(
            "{}/oauth/{}/callback",
            redirect_base.trim_end_matches('/'),
            provider_type
        );
        self.states
            .put(
                &state,
                OAuthStateData {
                    provider_type: provider_type.to_string(),
                    installation_name,
                    redirect_url: redirect_url.clone(),
                    expires_at,
                },
                OAUTH_STATE_TTL,
            )
            .await?;

        let auth_url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            config.auth_url,
            urlencode(&config.secrets.client_id),
            urlencode(&redirect_url),
            urlencode(&config.scopes.join(" ")),
            urlencode(&state),
        );
        info!(provider = %provider_type, "authorization started");
        Ok(AuthorizeOutcome {
            auth_url,
            state,
            expires_at,
        })
    }

    /// Complete the flow from the provider's redirect
    pub async fn callback(
        &self,
        code: &str,
        state: &str,
        provider_error: Option<&str>,
    ) -> Result<InstallationSummary> {
        // Consume first so a replayed callback dies on state, whatever
        // else it carries.
        let data = self
            .states
            .consume(state)
            .await?
            .ok_or_else(|| Error::unauthorized("invalid or expired oauth state"))?;
        if Utc::now() > data.expires_at {
            return Err(Error::unauthorized("invalid or expired oauth state"));
        }
        if let Some(err) = provider_error {
            warn!(provider = %data.provider_type, error = %err, "provider denied authorization");
            return Err(Error::unauthorized(format!(
                "provider returned error: {}",
                err
            )));
        }

        let config = self.configs.get(&data.provider_type).await?;
        let tokens = self.exchanger.exchange_code(&config, code).await?;
        let user = self
            .exchanger
            .fetch_user_info(&config, &tokens.access_token)
            .await?;

        let secrets = InstallationSecrets {
            access_token: Some(tokens.access_token.clone()),
            refresh_token: tokens.refresh_token.clone(),
            ..Default::default()
        };
        let oauth_expiry = expiry_from(&tokens);

        match self
            .installations
            .get_by_account_id(&data.provider_type, &user.account_id)
            .await
        {
            Ok(existing) => {
                self.installations
                    .update_secrets(&existing.id, &secrets, oauth_expiry)
                    .await?;
                self.installations.update_last_used(&existing.id).await?;
                info!(installation_id = %existing.id, "installation re-authorized");
                Ok(self.installations.get(&existing.id).await?.summary())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let name = data.installation_name.clone().unwrap_or_else(|| {
                    format!("{} ({})", display_name(&data.provider_type), user.account_id)
                });
                let installation = Installation {
                    id: new_id(),
                    name,
                    provider_type: data.provider_type.clone(),
                    auth_method: AuthMethod::OAuth2,
                    account_id: user.account_id,
                    secrets,
                    oauth_expiry,
                    scopes: if tokens.scopes.is_empty() {
                        config.scopes.clone()
                    } else {
                        tokens.scopes.clone()
                    },
                    created_at: Utc::now(),
                    last_used_at: None,
                };
                self.installations.save(&installation).await?;
                info!(installation_id = %installation.id, provider = %installation.provider_type,
                    "installation created");
                Ok(installation.summary())
            }
            Err(e) => Err(e),
        }
    }
}

fn expiry_from(tokens: &TokenResponse) -> Option<chrono::DateTime<Utc>> {
    tokens
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs as i64))
}

/// "github" -> "Github"
fn display_name(provider_type: &str) -> String {
    let mut chars = provider_type.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Percent-encode a query value
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
