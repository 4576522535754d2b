//! Vespa search engine adapter
//!
//! Speaks the document and query APIs of the external engine: one
//! document per chunk with the filterable document fields denormalised
//! in, YQL queries with a rank profile per search mode, and selection
//! deletes for document and source sweeps. Vector queries are refused
//! locally while the deployed schema is lexical-only.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use quarry_domain::constants::HEALTH_TIMEOUT;
use quarry_domain::entities::{Chunk, Document};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{SearchEngine, VespaConfigStore};
use quarry_domain::value_objects::{
    ScoredChunk, SearchHits, SearchMode, SearchOptions,
};

use crate::constants::PROVIDER_TIMEOUT_SECS;

/// Vespa document type and cluster used by the deployed package
const DOC_TYPE: &str = "chunk";
const CLUSTER: &str = "chunks";

pub struct VespaSearchEngine {
    endpoint: String,
    http_client: Client,
    config_store: Arc<dyn VespaConfigStore>,
}

impl VespaSearchEngine {
    pub fn new(endpoint: impl Into<String>, config_store: Arc<dyn VespaConfigStore>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http_client: Client::builder()
                .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            config_store,
        }
    }

    fn doc_url(&self, id: &str) -> String {
        format!(
            "{}/document/v1/quarry/{}/docid/{}",
            self.endpoint.trim_end_matches('/'),
            DOC_TYPE,
            urlencode(id)
        )
    }

    async fn check(&self, response: reqwest::Response, what: &str) -> Result<serde_json::Value> {
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        if status.is_success() {
            return Ok(body);
        }
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(Error::retryable(format!("vespa {} returned {}", what, status)));
        }
        Err(Error::invalid_input(format!(
            "vespa {} returned {}: {}",
            what, status, body
        )))
    }

    /// Build the YQL where-clause for the filters
    fn where_clause(opts: &SearchOptions) -> String {
        let mut clauses = vec!["userInput(@query)".to_string()];
        if opts.mode == SearchMode::Semantic {
            // Pure vector search replaces the text clause
            clauses[0] = format!(
                "{{targetHits: {}}}nearestNeighbor(embedding, query_embedding)",
                opts.limit + opts.offset
            );
        } else if opts.mode == SearchMode::Hybrid {
            clauses[0] = format!(
                "({{targetHits: {}}}nearestNeighbor(embedding, query_embedding) or userInput(@query))",
                opts.limit + opts.offset
            );
        }
        if !opts.filter.source_ids.is_empty() {
            let ids = opts
                .filter
                .source_ids
                .iter()
                .map(|id| format!("\"{}\"", id.replace('"', "")))
                .collect::<Vec<_>>()
                .join(", ");
            clauses.push(format!("source_id in ({})", ids));
        }
        if !opts.filter.mime_types.is_empty() {
            let types = opts
                .filter
                .mime_types
                .iter()
                .map(|m| format!("\"{}\"", m.replace('"', "")))
                .collect::<Vec<_>>()
                .join(", ");
            clauses.push(format!("mime_type in ({})", types));
        }
        if let Some(after) = opts.filter.updated_after {
            clauses.push(format!("updated_at >= {}", after.timestamp()));
        }
        if let Some(before) = opts.filter.updated_before {
            clauses.push(format!("updated_at <= {}", before.timestamp()));
        }
        clauses.join(" and ")
    }

    fn rank_profile(mode: SearchMode) -> &'static str {
        match mode {
            SearchMode::Text => "bm25",
            SearchMode::Semantic => "semantic",
            SearchMode::Hybrid => "hybrid",
        }
    }

    fn parse_hit(hit: &serde_json::Value) -> Option<ScoredChunk> {
        let fields = &hit["fields"];
        let content = fields["content"].as_str()?.to_string();
        let id = fields["documentid"]
            .as_str()
            .and_then(|d| d.rsplit("::").next())
            .unwrap_or_default()
            .to_string();
        let highlights = fields["content"]
            .as_str()
            .filter(|c| c.contains("<hi>"))
            .map(|c| vec![c.to_string()])
            .unwrap_or_default();
        Some(ScoredChunk {
            chunk: Chunk {
                id,
                document_id: fields["document_id"].as_str().unwrap_or_default().to_string(),
                source_id: fields["source_id"].as_str().unwrap_or_default().to_string(),
                content,
                embedding: None,
                position: fields["position"].as_u64().unwrap_or(0) as u32,
                start_char: 0,
                end_char: 0,
            },
            score: hit["relevance"].as_f64().unwrap_or(0.0) as f32,
            highlights,
        })
    }

    /// Delete every document matching a selection expression
    async fn delete_by_selection(&self, selection: &str) -> Result<()> {
        let url = format!(
            "{}/document/v1/quarry/{}/docid?selection={}&cluster={}",
            self.endpoint.trim_end_matches('/'),
            DOC_TYPE,
            urlencode(selection),
            CLUSTER
        );
        let response = self
            .http_client
            .delete(&url)
            .send()
            .await
            .map_err(|e| Error::retryable_with_source("vespa delete failed", e))?;
        self.check(response, "selection delete").await.map(|_| ())
    }
}

#[async_trait]
impl SearchEngine for VespaSearchEngine {
    async fn index(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            let mut fields = serde_json::json!({
                "content": chunk.content,
                "document_id": chunk.document_id,
                "source_id": chunk.source_id,
                "mime_type": document.mime_type,
                "updated_at": document.updated_at.timestamp(),
                "position": chunk.position,
            });
            if let Some(embedding) = &chunk.embedding {
                fields["embedding"] = serde_json::json!({ "values": embedding });
            }
            let response = self
                .http_client
                .post(self.doc_url(&chunk.id))
                .json(&serde_json::json!({ "fields": fields }))
                .send()
                .await
                .map_err(|e| Error::retryable_with_source("vespa feed failed", e))?;
            self.check(response, "feed").await?;
        }
        debug!(document_id = %document.id, chunks = chunks.len(), "chunks fed to vespa");
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        opts: &SearchOptions,
    ) -> Result<SearchHits> {
        if opts.mode.requires_embedding() {
            let config = self.config_store.get().await?;
            if !config.schema_mode.supports_embedding() {
                return Err(Error::invalid_input(
                    "deployed schema does not support vector queries",
                ));
            }
            if query_embedding.is_none() {
                return Err(Error::invalid_input("query embedding required"));
            }
        }

        let yql = format!(
            "select * from {} where {}",
            DOC_TYPE,
            Self::where_clause(opts)
        );
        let mut body = serde_json::json!({
            "yql": yql,
            "query": query,
            "hits": opts.limit,
            "offset": opts.offset,
            "ranking.profile": Self::rank_profile(opts.mode),
            "presentation.summary": "default",
        });
        if let Some(embedding) = query_embedding {
            body["input.query(query_embedding)"] = serde_json::json!(embedding);
        }

        let response = self
            .http_client
            .post(format!("{}/search/", self.endpoint.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::retryable_with_source("vespa query failed", e))?;
        let data = self.check(response, "query").await?;

        let total = data["root"]["fields"]["totalCount"].as_u64().unwrap_or(0);
        let hits = data["root"]["children"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Self::parse_hit)
            .collect();
        Ok(SearchHits { hits, total })
    }

    async fn delete(&self, chunk_ids: &[String]) -> Result<()> {
        for id in chunk_ids {
            let response = self
                .http_client
                .delete(self.doc_url(id))
                .send()
                .await
                .map_err(|e| Error::retryable_with_source("vespa delete failed", e))?;
            self.check(response, "delete").await?;
        }
        Ok(())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<()> {
        self.delete_by_selection(&format!(
            "{}.document_id=='{}'",
            DOC_TYPE,
            document_id.replace('\'', "")
        ))
        .await
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<()> {
        self.delete_by_selection(&format!(
            "{}.source_id=='{}'",
            DOC_TYPE,
            source_id.replace('\'', "")
        ))
        .await
    }

    async fn indexed_chunks(&self) -> Result<u64> {
        let body = serde_json::json!({
            "yql": format!("select * from {} where true", DOC_TYPE),
            "hits": 0,
        });
        let response = self
            .http_client
            .post(format!("{}/search/", self.endpoint.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::retryable_with_source("vespa count failed", e))?;
        let data = self.check(response, "count").await?;
        Ok(data["root"]["fields"]["totalCount"].as_u64().unwrap_or(0))
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .http_client
            .get(format!(
                "{}/state/v1/health",
                self.endpoint.trim_end_matches('/')
            ))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|_| Error::service_unavailable("vespa"))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::service_unavailable("vespa"))
        }
    }
}

/// Percent-encode a URL path/query segment
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
