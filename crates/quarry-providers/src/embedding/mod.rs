//! Embedding providers
//!
//! One client per supported provider, all implementing the
//! `EmbeddingService` port. HTTP failures are classified at this
//! boundary: rate limits and server trouble become `Retryable`,
//! rejected credentials become `Unauthorized`.

mod cohere;
pub(crate) mod helpers;
mod null;
mod ollama;
mod openai;
mod voyage;

pub use cohere::CohereEmbeddingProvider;
pub use null::NullEmbeddingProvider;
pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
pub use voyage::VoyageEmbeddingProvider;
