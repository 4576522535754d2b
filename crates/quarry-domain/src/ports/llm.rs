//! LLM service port
//!
//! Minimal surface: the core only needs completion for connection
//! probes and a health signal for the capability flags.

use async_trait::async_trait;

use crate::error::Result;

/// Chat/completion provider
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Produce a short completion for the prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier
    fn model(&self) -> &str;

    async fn health_check(&self) -> Result<()>;
}
