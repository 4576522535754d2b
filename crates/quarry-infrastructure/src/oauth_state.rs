//! OAuth state store
//!
//! Short-lived storage for pending authorization attempts, backed by a
//! TTL cache. Consume is a single atomic remove, which makes every
//! state token single-use and replay-safe.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use quarry_domain::constants::OAUTH_STATE_TTL;
use quarry_domain::error::Result;
use quarry_domain::ports::{OAuthStateData, OAuthStateStore};

/// Moka-backed single-use state store
pub struct MokaStateStore {
    cache: Cache<String, OAuthStateData>,
}

impl MokaStateStore {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(OAUTH_STATE_TTL)
                .max_capacity(10_000)
                .build(),
        }
    }
}

impl Default for MokaStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuthStateStore for MokaStateStore {
    async fn put(&self, state: &str, data: OAuthStateData, _ttl: Duration) -> Result<()> {
        // The cache-wide TTL matches the state lifetime; per-entry
        // expiry also rides on the embedded expires_at check upstream.
        self.cache.insert(state.to_string(), data).await;
        Ok(())
    }

    async fn consume(&self, state: &str) -> Result<Option<OAuthStateData>> {
        Ok(self.cache.remove(state).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn data() -> OAuthStateData {
        OAuthStateData {
            provider_type: "github".into(),
            installation_name: None,
            redirect_url: "https://quarry.local/oauth/github/callback".into(),
            expires_at: Utc::now() + chrono::Duration::minutes(10),
        }
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        let store = MokaStateStore::new();
        store
            .put("state-1", data(), OAUTH_STATE_TTL)
            .await
            .unwrap();

        let first = store.consume("state-1").await.unwrap();
        assert_eq!(first.unwrap().provider_type, "github");
        assert!(store.consume("state-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_state_is_none() {
        let store = MokaStateStore::new();
        assert!(store.consume("ghost").await.unwrap().is_none());
    }
}
