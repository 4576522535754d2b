//! Search service
//!
//! Query entry point. Applies runtime capabilities, produces the query
//! embedding, dispatches to the engine and decorates hits with their
//! documents. The query path prefers partial success: rather than
//! failing, it downgrades to lexical search and annotates the response.

use std::sync::Arc;
use std::time::Instant;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::runtime::{AiHandles, RuntimeCapabilities};
use quarry_domain::entities::AuthContext;
use quarry_domain::error::{Error, ErrorKind, Result};
use quarry_domain::ports::{DocumentStore, SearchEngine, SettingsStore};
use quarry_domain::value_objects::{
    RankedChunk, SearchFilter, SearchMode, SearchOptions, SearchRequest, SearchResponse,
};

pub struct SearchService {
    engine: Arc<dyn SearchEngine>,
    documents: Arc<dyn DocumentStore>,
    settings: Arc<dyn SettingsStore>,
    capabilities: Arc<RuntimeCapabilities>,
    ai: Arc<AiHandles>,
}

impl SearchService {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        documents: Arc<dyn DocumentStore>,
        settings: Arc<dyn SettingsStore>,
        capabilities: Arc<RuntimeCapabilities>,
        ai: Arc<AiHandles>,
    ) -> Self {
        Self {
            engine,
            documents,
            settings,
            capabilities,
            ai,
        }
    }

    pub async fn search(&self, ctx: &AuthContext, req: SearchRequest) -> Result<SearchResponse> {
        let started = Instant::now();
        let query = req.query.trim();
        if query.is_empty() {
            return Err(Error::invalid_input("query must not be empty"));
        }

        let settings = self.settings.get(&ctx.team_id).await?;
        let limit = req
            .limit
            .unwrap_or(settings.results_per_page)
            .clamp(1, settings.max_results_per_page);

        let requested = req
            .mode
            .unwrap_or_else(|| self.capabilities.effective_search_mode());
        let (mut mode, mut downgraded) = self.resolve_mode(requested);

        // Produce the query embedding; embedder trouble downgrades
        // instead of failing the search.
        let mut query_embedding = None;
        if mode.requires_embedding() {
            match self.embed_query(query).await {
                Ok(vector) => query_embedding = Some(vector),
                Err(e) => {
                    warn!(error = %e, "query embedding failed, downgrading to text");
                    mode = SearchMode::Text;
                    downgraded = true;
                }
            }
        }

        let opts = SearchOptions {
            mode,
            filter: SearchFilter {
                source_ids: req.source_ids,
                mime_types: req.mime_types,
                updated_after: req.updated_after,
                updated_before: req.updated_before,
            },
            limit,
            offset: req.offset,
        };

        let hits = match self
            .engine
            .search(query, query_embedding.as_deref(), &opts)
            .await
        {
            Ok(hits) => hits,
            // A lexical-only schema rejects vector modes; degrade once.
            Err(e) if e.kind() == ErrorKind::InvalidInput && mode.requires_embedding() => {
                debug!("engine rejected {:?} query, retrying as text", mode);
                mode = SearchMode::Text;
                downgraded = true;
                let opts = SearchOptions {
                    mode,
                    ..opts
                };
                self.engine.search(query, None, &opts).await?
            }
            Err(e) => return Err(e),
        };

        let results = self.decorate(hits.hits).await?;
        Ok(SearchResponse {
            results,
            total: hits.total,
            mode,
            downgraded,
            limit,
            offset: req.offset,
            took_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Downgrade modes the runtime cannot serve
    fn resolve_mode(&self, requested: SearchMode) -> (SearchMode, bool) {
        if requested.requires_embedding() && !self.capabilities.embedding_available() {
            (SearchMode::Text, true)
        } else {
            (requested, false)
        }
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedder = self
            .ai
            .embedder()
            .ok_or_else(|| Error::service_unavailable("embedding service"))?;
        embedder.embed_query(query).await
    }

    /// Attach documents by one batched lookup over distinct ids
    async fn decorate(
        &self,
        hits: Vec<quarry_domain::value_objects::ScoredChunk>,
    ) -> Result<Vec<RankedChunk>> {
        let ids: Vec<String> = hits
            .iter()
            .map(|h| h.chunk.document_id.clone())
            .unique()
            .collect();
        let documents = self.documents.get_many(&ids).await?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let document = documents
                    .iter()
                    .find(|d| d.id == hit.chunk.document_id)
                    .cloned();
                RankedChunk {
                    chunk: hit.chunk,
                    document,
                    score: hit.score,
                    highlights: hit.highlights,
                }
            })
            .collect())
    }
}
