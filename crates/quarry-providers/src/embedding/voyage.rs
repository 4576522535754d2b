//! Voyage AI embedding provider

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use quarry_domain::error::{Error, Result};
use quarry_domain::ports::EmbeddingService;

use crate::constants::{
    CONTENT_TYPE_JSON, EMBEDDING_DIMENSION_VOYAGE_3, EMBEDDING_DIMENSION_VOYAGE_3_LITE,
};
use crate::embedding::helpers::{check_and_parse, classify_request_error, parse_vector};

pub struct VoyageEmbeddingProvider {
    api_key: String,
    model: String,
    timeout: Duration,
    http_client: Client,
}

impl VoyageEmbeddingProvider {
    pub fn new(api_key: String, model: String, timeout: Duration, http_client: Client) -> Self {
        Self {
            api_key,
            model,
            timeout,
            http_client,
        }
    }

    async fn fetch_embeddings(
        &self,
        texts: &[String],
        input_type: &str,
    ) -> Result<Vec<Vec<f32>>> {
        let payload = serde_json::json!({
            "input": texts,
            "model": self.model,
            "input_type": input_type,
        });
        let response = self
            .http_client
            .post("https://api.voyageai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", CONTENT_TYPE_JSON)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_request_error(e, "Voyage"))?;

        let data = check_and_parse(response, "Voyage").await?;
        let items = data["data"]
            .as_array()
            .ok_or_else(|| Error::invalid_input("Voyage response missing data array"))?;
        if items.len() != texts.len() {
            return Err(Error::invalid_input(format!(
                "Voyage returned {} embeddings for {} inputs",
                items.len(),
                texts.len()
            )));
        }
        items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_vector(&item["embedding"], &format!("Voyage item {}", i)))
            .collect()
    }
}

#[async_trait]
impl EmbeddingService for VoyageEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        // Voyage distinguishes corpus and query embeddings
        self.fetch_embeddings(texts, "document").await
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vectors = self.fetch_embeddings(&[query.to_string()], "query").await?;
        Ok(vectors.remove(0))
    }

    fn dimensions(&self) -> usize {
        match self.model.as_str() {
            "voyage-3" => EMBEDDING_DIMENSION_VOYAGE_3,
            "voyage-3-lite" => EMBEDDING_DIMENSION_VOYAGE_3_LITE,
            _ => EMBEDDING_DIMENSION_VOYAGE_3,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<()> {
        self.embed_query("ping").await.map(|_| ())
    }
}
