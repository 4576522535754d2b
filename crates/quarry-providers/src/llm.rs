//! LLM probe client
//!
//! Thin completion client covering the three wire shapes the settings
//! service can be pointed at: OpenAI-compatible chat, Anthropic
//! messages, and Ollama generate. Only what the AI status probe needs;
//! no streaming.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use quarry_domain::entities::AiProvider;
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::LlmService;

use crate::constants::CONTENT_TYPE_JSON;
use crate::embedding::helpers::{check_and_parse, classify_request_error};

pub struct LlmClient {
    provider: AiProvider,
    api_key: Option<String>,
    base_url: Option<String>,
    model: String,
    timeout: Duration,
    http_client: Client,
}

impl LlmClient {
    pub fn new(
        provider: AiProvider,
        api_key: Option<String>,
        base_url: Option<String>,
        model: String,
        timeout: Duration,
        http_client: Client,
    ) -> Self {
        Self {
            provider,
            api_key,
            base_url,
            model,
            timeout,
            http_client,
        }
    }

    fn base_url(&self) -> String {
        let default = match self.provider {
            AiProvider::OpenAi => "https://api.openai.com/v1",
            AiProvider::Anthropic => "https://api.anthropic.com/v1",
            AiProvider::Ollama => "http://localhost:11434",
            // Cohere and Voyage are embedding-side; their chat shapes
            // are OpenAI-compatible enough for the probe
            AiProvider::Cohere => "https://api.cohere.com/compatibility/v1",
            AiProvider::Voyage => "https://api.voyageai.com/v1",
        };
        self.base_url
            .clone()
            .unwrap_or_else(|| default.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or("")
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": 32,
        });
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url()))
            .header("Authorization", format!("Bearer {}", self.api_key()))
            .header("Content-Type", CONTENT_TYPE_JSON)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_request_error(e, "LLM"))?;
        let data = check_and_parse(response, "LLM").await?;
        Ok(data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "max_tokens": 32,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url()))
            .header("x-api-key", self.api_key())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", CONTENT_TYPE_JSON)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_request_error(e, "LLM"))?;
        let data = check_and_parse(response, "LLM").await?;
        Ok(data["content"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url()))
            .header("Content-Type", CONTENT_TYPE_JSON)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_request_error(e, "LLM"))?;
        let data = check_and_parse(response, "LLM").await?;
        Ok(data["response"].as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl LlmService for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.provider {
            AiProvider::Anthropic => self.complete_anthropic(prompt).await,
            AiProvider::Ollama => self.complete_ollama(prompt).await,
            AiProvider::OpenAi | AiProvider::Cohere => self.complete_openai(prompt).await,
            AiProvider::Voyage => Err(Error::invalid_provider(
                "voyage has no completion endpoint",
            )),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<()> {
        self.complete("ping").await.map(|_| ())
    }
}
