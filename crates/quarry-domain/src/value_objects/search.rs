//! Search value objects
//!
//! Request/response shapes for the query path and the engine port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Chunk, Document};

/// How a query is scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Text,
    Semantic,
    Hybrid,
}

impl SearchMode {
    /// Whether this mode needs a query embedding to run
    pub fn requires_embedding(self) -> bool {
        matches!(self, SearchMode::Semantic | SearchMode::Hybrid)
    }
}

/// Caller-facing search request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Requested mode; the service resolves the effective one
    pub mode: Option<SearchMode>,
    #[serde(default)]
    pub source_ids: Vec<String>,
    #[serde(default)]
    pub mime_types: Vec<String>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

/// Engine-level result filters
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub source_ids: Vec<String>,
    pub mime_types: Vec<String>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

/// Engine-level query options
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub filter: SearchFilter,
    pub limit: usize,
    pub offset: usize,
}

/// One engine hit before document decoration
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub highlights: Vec<String>,
}

/// Engine response: one page of hits plus the total match count
#[derive(Debug, Clone, Default)]
pub struct SearchHits {
    pub hits: Vec<ScoredChunk>,
    pub total: u64,
}

/// One decorated result returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedChunk {
    pub chunk: Chunk,
    pub document: Option<Document>,
    pub score: f32,
    pub highlights: Vec<String>,
}

/// Full response of the search service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<RankedChunk>,
    pub total: u64,
    /// The mode actually used after capability downgrades
    pub mode: SearchMode,
    /// True when the requested mode was downgraded
    pub downgraded: bool,
    pub limit: usize,
    pub offset: usize,
    pub took_ms: u64,
}
