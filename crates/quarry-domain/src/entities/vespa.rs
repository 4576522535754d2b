//! Search engine schema configuration
//!
//! Tracks the deployed schema capability level. Transitions are
//! monotonic: `none -> bm25`, `none -> hybrid`, `bm25 -> hybrid`; a
//! hybrid schema is never downgraded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability level of the deployed schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    None,
    Bm25,
    Hybrid,
}

impl SchemaMode {
    /// Whether moving to `next` respects schema monotonicity
    pub fn can_transition_to(self, next: SchemaMode) -> bool {
        matches!(
            (self, next),
            (SchemaMode::None, SchemaMode::Bm25)
                | (SchemaMode::None, SchemaMode::Hybrid)
                | (SchemaMode::Bm25, SchemaMode::Hybrid)
        ) || self == next
    }

    /// Whether queries needing vectors can run against this schema
    pub fn supports_embedding(self) -> bool {
        self == SchemaMode::Hybrid
    }
}

/// Persisted connection and schema state for the search engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VespaConfig {
    pub endpoint: String,
    pub connected: bool,
    pub dev_mode: bool,
    pub schema_mode: SchemaMode,
    /// Present iff `schema_mode` is hybrid; always > 0 then
    pub embedding_dim: Option<usize>,
    pub embedding_provider: Option<String>,
    pub schema_version: u32,
    pub cluster_info: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for VespaConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            endpoint: String::new(),
            connected: false,
            dev_mode: false,
            schema_mode: SchemaMode::None,
            embedding_dim: None,
            embedding_provider: None,
            schema_version: 0,
            cluster_info: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Admin-facing engine status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VespaStatus {
    pub connected: bool,
    pub schema_mode: SchemaMode,
    pub embedding_dim: Option<usize>,
    /// An embedder is available that the deployed schema does not use yet
    pub can_upgrade: bool,
    /// Deployed dimension no longer matches the active embedder
    pub reindex_required: bool,
    pub healthy: bool,
    pub indexed_chunks: u64,
    pub cluster_info: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_transitions_are_monotonic() {
        assert!(SchemaMode::None.can_transition_to(SchemaMode::Bm25));
        assert!(SchemaMode::None.can_transition_to(SchemaMode::Hybrid));
        assert!(SchemaMode::Bm25.can_transition_to(SchemaMode::Hybrid));
        assert!(SchemaMode::Hybrid.can_transition_to(SchemaMode::Hybrid));
        assert!(!SchemaMode::Hybrid.can_transition_to(SchemaMode::Bm25));
        assert!(!SchemaMode::Bm25.can_transition_to(SchemaMode::None));
    }
}
