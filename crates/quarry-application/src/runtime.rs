//! Runtime capabilities
//!
//! Process-wide, concurrency-safe capability flags. The settings service
//! flips them when providers are reconfigured; the search path and the
//! engine admin read them on every call. Writers are rare, so a plain
//! readers-writer lock is enough.

use std::sync::{Arc, PoisonError, RwLock};

use quarry_domain::ports::{EmbeddingService, LlmService};
use quarry_domain::value_objects::SearchMode;

/// Mutable capability record
#[derive(Debug, Clone)]
struct RuntimeConfig {
    session_backend: String,
    embedding_available: bool,
    llm_available: bool,
    embedding_dim: Option<usize>,
}

/// Process-wide capability flags behind a readers-writer lock
#[derive(Debug)]
pub struct RuntimeCapabilities {
    config: RwLock<RuntimeConfig>,
}

impl RuntimeCapabilities {
    pub fn new(session_backend: impl Into<String>) -> Self {
        Self {
            config: RwLock::new(RuntimeConfig {
                session_backend: session_backend.into(),
                embedding_available: false,
                llm_available: false,
                embedding_dim: None,
            }),
        }
    }

    pub fn set_embedding_available(&self, available: bool) {
        self.write().embedding_available = available;
    }

    pub fn embedding_available(&self) -> bool {
        self.read().embedding_available
    }

    pub fn set_llm_available(&self, available: bool) {
        self.write().llm_available = available;
    }

    pub fn llm_available(&self) -> bool {
        self.read().llm_available
    }

    /// Record the active embedder's vector dimension
    pub fn set_embedding_dim(&self, dim: Option<usize>) {
        self.write().embedding_dim = dim;
    }

    pub fn embedding_dim(&self) -> Option<usize> {
        self.read().embedding_dim
    }

    pub fn session_backend(&self) -> String {
        self.read().session_backend.clone()
    }

    /// The mode searches run in when the caller does not pin one:
    /// hybrid iff an embedder is available, text otherwise
    pub fn effective_search_mode(&self) -> SearchMode {
        if self.embedding_available() {
            SearchMode::Hybrid
        } else {
            SearchMode::Text
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RuntimeConfig> {
        // A poisoned guard still holds consistent flag data
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RuntimeConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RuntimeCapabilities {
    fn default() -> Self {
        Self::new("memory")
    }
}

/// Hot-swappable AI provider handles
///
/// The settings service installs new instances here after a successful
/// probe; the search path and the sync pipeline pick up the swap on
/// their next call without a restart.
#[derive(Default)]
pub struct AiHandles {
    embedder: RwLock<Option<Arc<dyn EmbeddingService>>>,
    llm: RwLock<Option<Arc<dyn LlmService>>>,
}

impl AiHandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn embedder(&self) -> Option<Arc<dyn EmbeddingService>> {
        self.embedder
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_embedder(&self, embedder: Option<Arc<dyn EmbeddingService>>) {
        *self
            .embedder
            .write()
            .unwrap_or_else(PoisonError::into_inner) = embedder;
    }

    pub fn llm(&self) -> Option<Arc<dyn LlmService>> {
        self.llm
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_llm(&self, llm: Option<Arc<dyn LlmService>>) {
        *self.llm.write().unwrap_or_else(PoisonError::into_inner) = llm;
    }
}
