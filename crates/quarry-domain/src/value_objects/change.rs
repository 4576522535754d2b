//! Change events emitted by connectors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incoming document descriptor carried by a change
///
/// This is the provider's view of a document before it gets a row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub external_id: String,
    pub path: String,
    pub title: String,
    pub mime_type: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One incremental event from a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    Added {
        document: DocumentMeta,
        content: String,
    },
    Modified {
        document: DocumentMeta,
        content: String,
    },
    Deleted {
        external_id: String,
    },
}

impl Change {
    /// Provider-side identity of the affected document
    pub fn external_id(&self) -> &str {
        match self {
            Change::Added { document, .. } | Change::Modified { document, .. } => {
                &document.external_id
            }
            Change::Deleted { external_id } => external_id,
        }
    }
}

/// A single document fetched on demand from a connector
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub meta: DocumentMeta,
    pub content: String,
    /// SHA-256 of the content, for change detection
    pub content_hash: String,
}
