//! Sync outcome value objects

use serde::{Deserialize, Serialize};

use crate::entities::SyncStatus;

/// Counters accumulated across one sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub documents_added: u64,
    pub documents_updated: u64,
    pub documents_deleted: u64,
    pub chunks_indexed: u64,
    /// Poison documents and failed embedding batches; these do not fail
    /// the sync
    pub errors: u64,
}

impl SyncStats {
    /// Merge counters from one container pass into the run total
    pub fn merge(&mut self, other: &SyncStats) {
        self.documents_added += other.documents_added;
        self.documents_updated += other.documents_updated;
        self.documents_deleted += other.documents_deleted;
        self.chunks_indexed += other.chunks_indexed;
        self.errors += other.errors;
    }
}

/// Outcome of one `sync_source` run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub source_id: String,
    pub status: SyncStatus,
    pub stats: SyncStats,
    pub error: Option<String>,
    pub took_ms: u64,
}
