//! Sync state entity
//!
//! 1:1 companion of a source tracking the last sync outcome and the
//! incremental cursor. While `status` is `Running` the distributed lock
//! `sync:<source_id>` is held by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::SyncStats;

/// Lifecycle of a source sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Last-sync bookkeeping for one source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub source_id: String,
    pub status: SyncStatus,
    /// Opaque continuation token; multi-container sources store a JSON
    /// object mapping container to token
    pub cursor: String,
    pub stats: SyncStats,
    pub error: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub next_sync_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncState {
    /// Fresh idle state for a source that has never synced
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            status: SyncStatus::Idle,
            cursor: String::new(),
            stats: SyncStats::default(),
            error: None,
            last_sync_at: None,
            next_sync_at: None,
            started_at: None,
            completed_at: None,
        }
    }
}
