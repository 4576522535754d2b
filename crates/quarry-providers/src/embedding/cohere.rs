//! Cohere embedding provider

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use quarry_domain::error::{Error, Result};
use quarry_domain::ports::EmbeddingService;

use crate::constants::{
    CONTENT_TYPE_JSON, EMBEDDING_DIMENSION_COHERE_V3, EMBEDDING_DIMENSION_COHERE_V3_LIGHT,
};
use crate::embedding::helpers::{check_and_parse, classify_request_error, parse_vector};

pub struct CohereEmbeddingProvider {
    api_key: String,
    model: String,
    timeout: Duration,
    http_client: Client,
}

impl CohereEmbeddingProvider {
    pub fn new(api_key: String, model: String, timeout: Duration, http_client: Client) -> Self {
        Self {
            api_key,
            model,
            timeout,
            http_client,
        }
    }

    async fn fetch_embeddings(&self, texts: &[String], input_type: &str) -> Result<Vec<Vec<f32>>> {
        let payload = serde_json::json!({
            "texts": texts,
            "model": self.model,
            "input_type": input_type,
            "embedding_types": ["float"],
        });
        let response = self
            .http_client
            .post("https://api.cohere.com/v2/embed")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", CONTENT_TYPE_JSON)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_request_error(e, "Cohere"))?;

        let data = check_and_parse(response, "Cohere").await?;
        let items = data["embeddings"]["float"]
            .as_array()
            .ok_or_else(|| Error::invalid_input("Cohere response missing embeddings"))?;
        if items.len() != texts.len() {
            return Err(Error::invalid_input(format!(
                "Cohere returned {} embeddings for {} inputs",
                items.len(),
                texts.len()
            )));
        }
        items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_vector(item, &format!("Cohere item {}", i)))
            .collect()
    }
}

#[async_trait]
impl EmbeddingService for CohereEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_embeddings(texts, "search_document").await
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vectors = self
            .fetch_embeddings(&[query.to_string()], "search_query")
            .await?;
        Ok(vectors.remove(0))
    }

    fn dimensions(&self) -> usize {
        match self.model.as_str() {
            "embed-english-v3.0" | "embed-multilingual-v3.0" => EMBEDDING_DIMENSION_COHERE_V3,
            "embed-english-light-v3.0" => EMBEDDING_DIMENSION_COHERE_V3_LIGHT,
            _ => EMBEDDING_DIMENSION_COHERE_V3,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<()> {
        self.embed_query("ping").await.map(|_| ())
    }
}
