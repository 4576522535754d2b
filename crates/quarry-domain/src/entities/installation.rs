//! Installation entity
//!
//! An authenticated connection to an external provider account. Secrets
//! live encrypted in the installation store and are decrypted only when
//! a full [`Installation`] is materialised inside the core; anything
//! serialised for callers goes through [`InstallationSummary`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::TOKEN_REFRESH_LEEWAY;

/// How an installation authenticates against its provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    OAuth2,
    ApiKey,
    Basic,
    ServiceAccount,
    Pat,
}

/// Decrypted credential material for one installation
///
/// Which fields are populated depends on [`AuthMethod`]. This type is
/// serialisable so the store can seal it as one blob; it must never be
/// embedded in a summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallationSecrets {
    /// OAuth2 access token or PAT
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// OAuth2 refresh token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Provider API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Basic-auth username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Basic-auth password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Service-account JSON blob
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_json: Option<String>,
}

/// An authenticated provider connection
///
/// Unique by `(provider_type, account_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub id: String,
    pub name: String,
    pub provider_type: String,
    pub auth_method: AuthMethod,
    /// Provider-side account identity (user id, org slug, ...)
    pub account_id: String,
    /// Decrypted secrets; never serialised with the row
    #[serde(skip)]
    pub secrets: InstallationSecrets,
    /// Expiry of the current access token, when the provider reports one
    pub oauth_expiry: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Installation {
    /// Whether the access token should be refreshed before the next use
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.oauth_expiry {
            Some(expiry) => {
                now + Duration::from_std(TOKEN_REFRESH_LEEWAY).unwrap_or_else(|_| Duration::zero())
                    >= expiry
            }
            None => false,
        }
    }

    /// Whether the access token is already past its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.oauth_expiry {
            Some(expiry) => now > expiry,
            None => false,
        }
    }

    /// Secret-free view for callers outside the core
    pub fn summary(&self) -> InstallationSummary {
        InstallationSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            provider_type: self.provider_type.clone(),
            auth_method: self.auth_method,
            account_id: self.account_id.clone(),
            scopes: self.scopes.clone(),
            oauth_expiry: self.oauth_expiry,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        }
    }
}

/// Secret-free installation view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationSummary {
    pub id: String,
    pub name: String,
    pub provider_type: String,
    pub auth_method: AuthMethod,
    pub account_id: String,
    pub scopes: Vec<String>,
    pub oauth_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installation(expiry: Option<DateTime<Utc>>) -> Installation {
        Installation {
            id: "ins1".into(),
            name: "GitHub (octocat)".into(),
            provider_type: "github".into(),
            auth_method: AuthMethod::OAuth2,
            account_id: "octocat".into(),
            secrets: InstallationSecrets {
                access_token: Some("a1".into()),
                refresh_token: Some("r1".into()),
                ..Default::default()
            },
            oauth_expiry: expiry,
            scopes: vec!["repo".into()],
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[test]
    fn refresh_window_is_five_minutes() {
        let now = Utc::now();
        let soon = installation(Some(now + Duration::minutes(3)));
        let later = installation(Some(now + Duration::minutes(30)));
        assert!(soon.needs_refresh(now));
        assert!(!soon.is_expired(now));
        assert!(!later.needs_refresh(now));
    }

    #[test]
    fn no_expiry_never_refreshes() {
        let ins = installation(None);
        assert!(!ins.needs_refresh(Utc::now()));
        assert!(!ins.is_expired(Utc::now()));
    }

    #[test]
    fn serialised_row_carries_no_secrets() {
        let ins = installation(None);
        let json = serde_json::to_string(&ins).unwrap();
        assert!(!json.contains("a1"));
        assert!(!json.contains("r1"));
        assert!(!json.contains("secrets"));
        let summary = serde_json::to_string(&ins.summary()).unwrap();
        assert!(!summary.contains("a1"));
    }
}
