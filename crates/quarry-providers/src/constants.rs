//! Provider constants

/// JSON content type header value
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Error message prefix for request timeouts
pub const ERROR_MSG_REQUEST_TIMEOUT: &str = "request timed out after";

// Embedding dimensions by model

pub const EMBEDDING_DIMENSION_OPENAI_SMALL: usize = 1536;
pub const EMBEDDING_DIMENSION_OPENAI_LARGE: usize = 3072;
pub const EMBEDDING_DIMENSION_OPENAI_ADA: usize = 1536;

pub const EMBEDDING_DIMENSION_VOYAGE_3: usize = 1024;
pub const EMBEDDING_DIMENSION_VOYAGE_3_LITE: usize = 512;

pub const EMBEDDING_DIMENSION_COHERE_V3: usize = 1024;
pub const EMBEDDING_DIMENSION_COHERE_V3_LIGHT: usize = 384;

pub const EMBEDDING_DIMENSION_OLLAMA_NOMIC: usize = 768;
pub const EMBEDDING_DIMENSION_OLLAMA_MINILM: usize = 384;
pub const EMBEDDING_DIMENSION_OLLAMA_MXBAI: usize = 1024;

/// Default request timeout for provider HTTP calls, seconds
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

/// GitHub REST API base URL
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Page size for GitHub commit listings
pub const GITHUB_PAGE_SIZE: usize = 100;
