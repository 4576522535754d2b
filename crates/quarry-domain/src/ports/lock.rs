//! Distributed lock port
//!
//! Mutual exclusion across workers. Locks expire after their TTL unless
//! extended; release and extend verify the holder's token so a stale
//! worker cannot release a lock it lost.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Proof of lock ownership
#[derive(Debug, Clone)]
pub struct LockLease {
    /// Lock name
    pub name: String,
    /// Unique token for this acquisition
    pub token: String,
}

/// Distributed lock provider
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Try to acquire; `None` when another holder is live
    async fn acquire(&self, name: &str, ttl: Duration) -> Result<Option<LockLease>>;

    /// Release a held lock; a no-op if the lease already expired
    async fn release(&self, lease: &LockLease) -> Result<()>;

    /// Push the expiry of a held lock forward
    async fn extend(&self, lease: &LockLease, ttl: Duration) -> Result<()>;

    /// Liveness probe of the lock backend
    async fn ping(&self) -> Result<()>;
}
