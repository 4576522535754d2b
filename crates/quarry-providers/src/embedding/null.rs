//! Null embedding provider
//!
//! Stands in when no embedder is configured. Every call fails with
//! `ServiceUnavailable`, which keeps the capability flag honest.

use async_trait::async_trait;

use quarry_domain::error::{Error, Result};
use quarry_domain::ports::EmbeddingService;

#[derive(Default)]
pub struct NullEmbeddingProvider;

impl NullEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmbeddingService for NullEmbeddingProvider {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::service_unavailable("embedding service"))
    }

    async fn embed_query(&self, _query: &str) -> Result<Vec<f32>> {
        Err(Error::service_unavailable("embedding service"))
    }

    fn dimensions(&self) -> usize {
        0
    }

    fn model(&self) -> &str {
        "null"
    }

    async fn health_check(&self) -> Result<()> {
        Err(Error::service_unavailable("embedding service"))
    }
}
