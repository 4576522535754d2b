//! In-process distributed lock
//!
//! Lock backend for single-node deployments and tests. Honours TTL
//! expiry and holder tokens exactly like an external backend would: an
//! expired lock is free for the taking, and release or extend with a
//! stale token is refused.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use quarry_domain::error::{Error, Result};
use quarry_domain::ids::new_id;
use quarry_domain::ports::{DistributedLock, LockLease};

struct Holder {
    token: String,
    expires_at: Instant,
}

/// DashMap-backed lock provider
#[derive(Default)]
pub struct InMemoryLock {
    locks: DashMap<String, Holder>,
}

impl InMemoryLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedLock for InMemoryLock {
    async fn acquire(&self, name: &str, ttl: Duration) -> Result<Option<LockLease>> {
        let now = Instant::now();
        let token = new_id();
        let mut acquired = false;

        self.locks
            .entry(name.to_string())
            .and_modify(|holder| {
                if holder.expires_at <= now {
                    // Previous holder timed out; the lock is free
                    holder.token = token.clone();
                    holder.expires_at = now + ttl;
                    acquired = true;
                }
            })
            .or_insert_with(|| {
                acquired = true;
                Holder {
                    token: token.clone(),
                    expires_at: now + ttl,
                }
            });

        Ok(acquired.then(|| LockLease {
            name: name.to_string(),
            token,
        }))
    }

    async fn release(&self, lease: &LockLease) -> Result<()> {
        self.locks
            .remove_if(&lease.name, |_, holder| holder.token == lease.token);
        Ok(())
    }

    async fn extend(&self, lease: &LockLease, ttl: Duration) -> Result<()> {
        let mut holder = self
            .locks
            .get_mut(&lease.name)
            .ok_or_else(|| Error::not_found(format!("lock {}", lease.name)))?;
        if holder.token != lease.token {
            return Err(Error::not_found(format!("lock {}", lease.name)));
        }
        holder.expires_at = Instant::now() + ttl;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
