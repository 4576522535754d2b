//! Document service
//!
//! Read access to ingested documents and the cascading delete that
//! keeps engine, chunk store and document store ordered.

use std::sync::Arc;

use tracing::info;

use quarry_domain::entities::{AuthContext, Document};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{ChunkStore, DocumentStore, SearchEngine, SourceStore};
use serde::{Deserialize, Serialize};

/// Document row with its chunk count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    #[serde(flatten)]
    pub document: Document,
    pub chunk_count: usize,
}

pub struct DocumentService {
    documents: Arc<dyn DocumentStore>,
    chunks: Arc<dyn ChunkStore>,
    engine: Arc<dyn SearchEngine>,
    sources: Arc<dyn SourceStore>,
}

impl DocumentService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        chunks: Arc<dyn ChunkStore>,
        engine: Arc<dyn SearchEngine>,
        sources: Arc<dyn SourceStore>,
    ) -> Self {
        Self {
            documents,
            chunks,
            engine,
            sources,
        }
    }

    pub async fn get(&self, ctx: &AuthContext, id: &str) -> Result<DocumentSummary> {
        let document = self.documents.get(id).await?;
        self.check_team(ctx, &document).await?;
        let chunk_count = self.chunks.get_by_document(id).await?.len();
        Ok(DocumentSummary {
            document,
            chunk_count,
        })
    }

    pub async fn list_by_source(
        &self,
        ctx: &AuthContext,
        source_id: &str,
    ) -> Result<Vec<Document>> {
        let source = self.sources.get(source_id).await?;
        if source.team_id != ctx.team_id {
            return Err(Error::not_found(format!("source {}", source_id)));
        }
        let mut documents = self.documents.list_by_source(source_id).await?;
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(documents)
    }

    /// Delete one document everywhere
    ///
    /// Engine first, then chunks, then the row, so a reader never sees a
    /// hit whose chunk or document is already gone.
    pub async fn delete(&self, ctx: &AuthContext, id: &str) -> Result<()> {
        ctx.require_member()?;
        let document = self.documents.get(id).await?;
        self.check_team(ctx, &document).await?;

        self.engine.delete_by_document(id).await?;
        self.chunks.delete_by_document(id).await?;
        self.documents.delete(id).await?;
        info!(document_id = %id, "document deleted");
        Ok(())
    }

    /// Delete everything a source ever indexed
    pub async fn delete_by_source(&self, ctx: &AuthContext, source_id: &str) -> Result<u64> {
        ctx.require_admin()?;
        let source = self.sources.get(source_id).await?;
        if source.team_id != ctx.team_id {
            return Err(Error::not_found(format!("source {}", source_id)));
        }

        self.engine.delete_by_source(source_id).await?;
        self.chunks.delete_by_source(source_id).await?;
        let removed = self.documents.delete_by_source(source_id).await?;
        info!(source_id = %source_id, removed, "source documents purged");
        Ok(removed)
    }

    async fn check_team(&self, ctx: &AuthContext, document: &Document) -> Result<()> {
        let source = self.sources.get(&document.source_id).await?;
        if source.team_id != ctx.team_id {
            return Err(Error::not_found(format!("document {}", document.id)));
        }
        Ok(())
    }
}
