//! Provider implementations for Quarry
//!
//! Everything that talks to the outside world: embedding and LLM
//! clients, the connector registry with its token plumbing, the OAuth
//! HTTP exchanger, the search engine adapters and the content
//! normalisers.

pub mod connectors;
pub mod constants;
pub mod embedding;
pub mod llm;
pub mod normalise;
pub mod oauth_http;
pub mod search;

mod ai_factory;
pub use ai_factory::HttpAiProviderFactory;
