//! AI provider factory
//!
//! Builds embedding and LLM clients from persisted provider settings.
//! This is where the settings service's hot swap gets its instances.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use quarry_application::services::AiProviderFactory;
use quarry_domain::entities::{AiProvider, AiProviderConfig};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{EmbeddingService, LlmService};

use crate::constants::PROVIDER_TIMEOUT_SECS;
use crate::embedding::{
    CohereEmbeddingProvider, OllamaEmbeddingProvider, OpenAiEmbeddingProvider,
    VoyageEmbeddingProvider,
};
use crate::llm::LlmClient;

/// Factory building reqwest-backed provider clients
pub struct HttpAiProviderFactory {
    timeout: Duration,
}

impl HttpAiProviderFactory {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(PROVIDER_TIMEOUT_SECS),
        }
    }

    fn http_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::internal(format!("http client build failed: {}", e)))
    }

    fn require_key(config: &AiProviderConfig) -> Result<String> {
        config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "{} requires an API key",
                    config.provider.as_str()
                ))
            })
    }
}

impl Default for HttpAiProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AiProviderFactory for HttpAiProviderFactory {
    fn create_embedder(&self, config: &AiProviderConfig) -> Result<Arc<dyn EmbeddingService>> {
        let client = self.http_client()?;
        match config.provider {
            AiProvider::OpenAi => Ok(Arc::new(OpenAiEmbeddingProvider::new(
                Self::require_key(config)?,
                config.base_url.clone(),
                config.model.clone(),
                self.timeout,
                client,
            ))),
            AiProvider::Ollama => Ok(Arc::new(OllamaEmbeddingProvider::new(
                config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
                config.model.clone(),
                self.timeout,
                client,
            ))),
            AiProvider::Voyage => Ok(Arc::new(VoyageEmbeddingProvider::new(
                Self::require_key(config)?,
                config.model.clone(),
                self.timeout,
                client,
            ))),
            AiProvider::Cohere => Ok(Arc::new(CohereEmbeddingProvider::new(
                Self::require_key(config)?,
                config.model.clone(),
                self.timeout,
                client,
            ))),
            AiProvider::Anthropic => Err(Error::invalid_provider(
                "anthropic has no embeddings endpoint",
            )),
        }
    }

    fn create_llm(&self, config: &AiProviderConfig) -> Result<Arc<dyn LlmService>> {
        Ok(Arc::new(LlmClient::new(
            config.provider,
            config.api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
            self.timeout,
            self.http_client()?,
        )))
    }
}
