//! OAuth HTTP exchanger
//!
//! Talks to provider token endpoints with standard authorization-code
//! and refresh-token form posts, then resolves the authorizing account
//! through the provider's identity endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use quarry_domain::entities::ProviderConfig;
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{OAuthExchanger, OAuthUserInfo, TokenResponse};

use crate::constants::PROVIDER_TIMEOUT_SECS;
use crate::embedding::helpers::{check_and_parse, classify_request_error};

pub struct HttpOAuthExchanger {
    http_client: Client,
}

impl HttpOAuthExchanger {
    pub fn new() -> Self {
        Self {
            http_client: Client::builder()
                .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
                .user_agent("quarry-oauth")
                .build()
                .unwrap_or_default(),
        }
    }

    async fn token_request(
        &self,
        config: &ProviderConfig,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse> {
        let response = self
            .http_client
            .post(&config.token_url)
            .header("Accept", "application/json")
            .form(params)
            .send()
            .await
            .map_err(|e| classify_request_error(e, "OAuth"))?;

        let data = check_and_parse(response, "OAuth").await?;
        if let Some(err) = data["error"].as_str() {
            return Err(Error::unauthorized(format!(
                "token endpoint returned {}: {}",
                err,
                data["error_description"].as_str().unwrap_or("")
            )));
        }
        let access_token = data["access_token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::unauthorized("token endpoint returned no access token"))?
            .to_string();
        let scopes = data["scope"]
            .as_str()
            .map(|s| {
                s.split([' ', ','])
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(TokenResponse {
            access_token,
            refresh_token: data["refresh_token"].as_str().map(str::to_string),
            expires_in: data["expires_in"].as_u64(),
            scopes,
        })
    }

    /// Identity endpoint for a provider type
    fn user_info_endpoint(provider_type: &str) -> Result<&'static str> {
        match provider_type {
            "github" => Ok("https://api.github.com/user"),
            "gitlab" => Ok("https://gitlab.com/api/v4/user"),
            "google" => Ok("https://www.googleapis.com/oauth2/v2/userinfo"),
            "slack" => Ok("https://slack.com/api/users.identity"),
            other => Err(Error::invalid_provider(format!(
                "no identity endpoint known for {}",
                other
            ))),
        }
    }
}

impl Default for HttpOAuthExchanger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuthExchanger for HttpOAuthExchanger {
    async fn exchange_code(&self, config: &ProviderConfig, code: &str) -> Result<TokenResponse> {
        self.token_request(
            config,
            &[
                ("client_id", config.secrets.client_id.as_str()),
                ("client_secret", config.secrets.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", config.redirect_uri.as_str()),
            ],
        )
        .await
    }

    async fn refresh(
        &self,
        config: &ProviderConfig,
        refresh_token: &str,
    ) -> Result<TokenResponse> {
        self.token_request(
            config,
            &[
                ("client_id", config.secrets.client_id.as_str()),
                ("client_secret", config.secrets.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
    }

    async fn fetch_user_info(
        &self,
        config: &ProviderConfig,
        access_token: &str,
    ) -> Result<OAuthUserInfo> {
        let endpoint = Self::user_info_endpoint(&config.provider_type)?;
        let response = self
            .http_client
            .get(endpoint)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| classify_request_error(e, "OAuth"))?;
        let data = check_and_parse(response, "OAuth").await?;

        // Field names differ per provider; try the common spellings
        let account_id = data["id"]
            .as_u64()
            .map(|id| id.to_string())
            .or_else(|| data["id"].as_str().map(str::to_string))
            .or_else(|| data["user"]["id"].as_str().map(str::to_string))
            .ok_or_else(|| Error::unauthorized("identity endpoint returned no account id"))?;
        Ok(OAuthUserInfo {
            account_id,
            email: data["email"]
                .as_str()
                .or_else(|| data["user"]["email"].as_str())
                .map(str::to_string),
            name: data["name"]
                .as_str()
                .or_else(|| data["login"].as_str())
                .or_else(|| data["user"]["name"].as_str())
                .map(str::to_string),
        })
    }
}
