//! OpenAI embedding provider
//!
//! Implements the embedding port against OpenAI's embeddings API.
//! Supports text-embedding-3-small, text-embedding-3-large and ada-002;
//! an OpenAI-compatible endpoint can be targeted via `base_url`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use quarry_domain::error::{Error, Result};
use quarry_domain::ports::EmbeddingService;

use crate::constants::{
    CONTENT_TYPE_JSON, EMBEDDING_DIMENSION_OPENAI_ADA, EMBEDDING_DIMENSION_OPENAI_LARGE,
    EMBEDDING_DIMENSION_OPENAI_SMALL,
};
use crate::embedding::helpers::{check_and_parse, classify_request_error, parse_vector};

pub struct OpenAiEmbeddingProvider {
    api_key: String,
    base_url: Option<String>,
    model: String,
    timeout: Duration,
    http_client: Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: String,
        timeout: Duration,
        http_client: Client,
    ) -> Self {
        Self {
            api_key,
            base_url,
            model,
            timeout,
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1")
    }

    async fn fetch_embeddings(&self, texts: &[String]) -> Result<serde_json::Value> {
        let payload = serde_json::json!({
            "input": texts,
            "model": self.model,
            "encoding_format": "float"
        });

        let response = self
            .http_client
            .post(format!("{}/embeddings", self.base_url().trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", CONTENT_TYPE_JSON)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_request_error(e, "OpenAI"))?;

        check_and_parse(response, "OpenAI").await
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self.fetch_embeddings(texts).await?;
        let data = response["data"]
            .as_array()
            .ok_or_else(|| Error::invalid_input("OpenAI response missing data array"))?;
        if data.len() != texts.len() {
            return Err(Error::invalid_input(format!(
                "OpenAI returned {} embeddings for {} inputs",
                data.len(),
                texts.len()
            )));
        }
        data.iter()
            .enumerate()
            .map(|(i, item)| parse_vector(&item["embedding"], &format!("OpenAI item {}", i)))
            .collect()
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[query.to_string()]).await?;
        Ok(vectors.remove(0))
    }

    fn dimensions(&self) -> usize {
        match self.model.as_str() {
            "text-embedding-3-small" => EMBEDDING_DIMENSION_OPENAI_SMALL,
            "text-embedding-3-large" => EMBEDDING_DIMENSION_OPENAI_LARGE,
            "text-embedding-ada-002" => EMBEDDING_DIMENSION_OPENAI_ADA,
            _ => EMBEDDING_DIMENSION_OPENAI_SMALL,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<()> {
        self.embed_query("ping").await.map(|_| ())
    }
}
