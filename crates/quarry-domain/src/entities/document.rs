//! Document and chunk entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ingested document, unique by `(source_id, external_id)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_id: String,
    /// Provider-side identity of the document
    pub external_id: String,
    pub path: String,
    pub title: String,
    pub mime_type: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub indexed_at: Option<DateTime<Utc>>,
}

/// A search-indexable text window of a document
///
/// All chunks of a document share its `source_id`; `position` is dense
/// from 0 and `start_char <= end_char` within the normalised text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub source_id: String,
    pub content: String,
    /// Present only when an embedder produced a vector for this chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub position: u32,
    pub start_char: usize,
    pub end_char: usize,
}

impl Chunk {
    /// Deterministic chunk id so re-indexing overwrites in place
    pub fn chunk_id(document_id: &str, position: u32) -> String {
        format!("{}:{}", document_id, position)
    }
}
