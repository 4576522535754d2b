//! Embedding service port

use async_trait::async_trait;

use crate::error::Result;

/// Text embedding provider
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a batch of texts; one vector per input, in order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>>;

    /// Vector dimension this provider produces
    fn dimensions(&self) -> usize;

    /// Model identifier
    fn model(&self) -> &str;

    async fn health_check(&self) -> Result<()>;
}
