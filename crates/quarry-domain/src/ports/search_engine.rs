//! Search engine port

use async_trait::async_trait;

use crate::entities::{Chunk, Document};
use crate::error::Result;
use crate::value_objects::{SearchHits, SearchOptions};

/// The external hybrid search engine
///
/// Writes use the chunk's own id, so re-indexing a document overwrites
/// its previous chunks in place. Queries needing vectors against a
/// lexical-only schema are rejected with `InvalidInput`; the search
/// service turns that into a mode downgrade.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Index a document's chunks, denormalising the document fields the
    /// engine filters on
    async fn index(&self, document: &Document, chunks: &[Chunk]) -> Result<()>;

    /// Execute one query; `query_embedding` is required by semantic and
    /// hybrid modes
    async fn search(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        opts: &SearchOptions,
    ) -> Result<SearchHits>;

    async fn delete(&self, chunk_ids: &[String]) -> Result<()>;

    async fn delete_by_document(&self, document_id: &str) -> Result<()>;

    async fn delete_by_source(&self, source_id: &str) -> Result<()>;

    /// Total chunks currently indexed
    async fn indexed_chunks(&self) -> Result<u64>;

    async fn health_check(&self) -> Result<()>;
}
