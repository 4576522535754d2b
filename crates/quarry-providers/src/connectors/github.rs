//! GitHub connector
//!
//! Indexes repository contents through the REST API. Containers are
//! repositories (`owner/repo`); the incremental cursor is the ISO
//! timestamp of the newest commit already seen, so each fetch lists
//! only commits strictly after it and folds their file changes into
//! one batch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::debug;

use quarry_domain::entities::Source;
use quarry_domain::error::{Error, Result};
use quarry_domain::ids::content_hash;
use quarry_domain::ports::{
    ChangeBatch, Connector, ConnectorBuilder, OAuthDefaults, TokenProvider,
};
use quarry_domain::value_objects::{Change, DocumentMeta, FetchedDocument};

use crate::constants::{GITHUB_API_BASE, GITHUB_PAGE_SIZE, PROVIDER_TIMEOUT_SECS};

/// Builder for the `github` provider
pub struct GitHubConnectorBuilder {
    api_base: String,
    http_client: Client,
}

impl GitHubConnectorBuilder {
    pub fn new() -> Self {
        Self::with_api_base(GITHUB_API_BASE)
    }

    /// Point at a GitHub Enterprise or test endpoint
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            http_client: Client::builder()
                .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
                .user_agent("quarry-sync")
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for GitHubConnectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorBuilder for GitHubConnectorBuilder {
    fn provider_type(&self) -> &str {
        "github"
    }

    fn supports_oauth(&self) -> bool {
        true
    }

    fn oauth_defaults(&self) -> Option<OAuthDefaults> {
        Some(OAuthDefaults {
            auth_url: "https://github.com/login/oauth/authorize".into(),
            token_url: "https://github.com/login/oauth/access_token".into(),
            scopes: vec!["repo".into(), "read:org".into()],
        })
    }

    fn supports_container_selection(&self) -> bool {
        true
    }

    fn build(
        &self,
        token_provider: Arc<dyn TokenProvider>,
        container_id: &str,
    ) -> Result<Arc<dyn Connector>> {
        Ok(Arc::new(GitHubConnector {
            api_base: self.api_base.clone(),
            repo: container_id.to_string(),
            token_provider,
            http_client: self.http_client.clone(),
        }))
    }
}

struct GitHubConnector {
    api_base: String,
    /// `owner/repo` this connector is scoped to
    repo: String,
    token_provider: Arc<dyn TokenProvider>,
    http_client: Client,
}

impl GitHubConnector {
    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let token = self.token_provider.access_token().await?;
        let response = self
            .http_client
            .get(format!("{}{}", self.api_base.trim_end_matches('/'), path))
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| {
                Error::retryable_with_source("GitHub request failed", e)
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| Error::invalid_input(format!("GitHub response parse failed: {}", e)));
        }
        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(Error::unauthorized(format!("GitHub rejected token: {}", status))),
            404 => Err(Error::not_found(format!("GitHub resource {}", path))),
            429 => Err(Error::retryable("GitHub rate limit hit")),
            s if status.is_server_error() => {
                Err(Error::retryable(format!("GitHub returned {}: {}", s, body)))
            }
            _ => Err(Error::invalid_input(format!(
                "GitHub returned {}: {}",
                status, body
            ))),
        }
    }

    /// Fetch and decode one file's content at HEAD
    async fn fetch_file(&self, path: &str) -> Result<(DocumentMeta, String)> {
        let data = self
            .get_json(&format!("/repos/{}/contents/{}", self.repo, path))
            .await?;
        let encoded = data["content"].as_str().unwrap_or_default().replace('\n', "");
        let bytes = general_purpose::STANDARD
            .decode(&encoded)
            .map_err(|_| Error::invalid_input(format!("undecodable content for {}", path)))?;
        let content = String::from_utf8_lossy(&bytes).to_string();

        let title = path.rsplit('/').next().unwrap_or(path).to_string();
        let meta = DocumentMeta {
            external_id: path.to_string(),
            path: format!("{}/{}", self.repo, path),
            title,
            mime_type: mime_for(path),
            metadata: serde_json::json!({
                "repo": self.repo,
                "sha": data["sha"].as_str().unwrap_or_default(),
            }),
            updated_at: None,
        };
        Ok((meta, content))
    }
}

#[async_trait]
impl Connector for GitHubConnector {
    fn provider_type(&self) -> &str {
        "github"
    }

    fn validate_config(&self, source: &Source) -> Result<()> {
        for container in &source.selected_containers {
            let mut parts = container.splitn(2, '/');
            let owner = parts.next().unwrap_or("");
            let repo = parts.next().unwrap_or("");
            if owner.is_empty() || repo.is_empty() {
                return Err(Error::invalid_input(format!(
                    "container {:?} is not owner/repo",
                    container
                )));
            }
        }
        Ok(())
    }

    async fn test_connection(&self) -> Result<()> {
        self.get_json("/user").await.map(|_| ())
    }

    async fn fetch_document(&self, external_id: &str) -> Result<FetchedDocument> {
        let (meta, content) = self.fetch_file(external_id).await?;
        let content_hash = content_hash(content.as_bytes());
        Ok(FetchedDocument {
            meta,
            content,
            content_hash,
        })
    }

    async fn fetch_changes(&self, _source: &Source, cursor: Option<&str>) -> Result<ChangeBatch> {
        let mut path = format!(
            "/repos/{}/commits?per_page={}",
            self.repo, GITHUB_PAGE_SIZE
        );
        if let Some(since) = cursor.filter(|c| !c.is_empty()) {
            path.push_str(&format!("&since={}", since));
        }
        let commits = self.get_json(&path).await?;
        let commits = commits
            .as_array()
            .cloned()
            .unwrap_or_default();

        // The list API returns newest first; replay oldest to newest so
        // the last writer for a file wins.
        let mut newest: Option<DateTime<Utc>> = None;
        let mut file_states: Vec<(String, String)> = Vec::new();
        for commit in commits.iter().rev() {
            let sha = commit["sha"].as_str().unwrap_or_default();
            if let Some(date) = commit["commit"]["committer"]["date"]
                .as_str()
                .and_then(|d| d.parse::<DateTime<Utc>>().ok())
            {
                // The since filter is inclusive; skip the cursor commit
                if cursor
                    .and_then(|c| c.parse::<DateTime<Utc>>().ok())
                    .is_some_and(|seen| date <= seen)
                {
                    continue;
                }
                newest = Some(newest.map_or(date, |n| n.max(date)));
            }
            let detail = self
                .get_json(&format!("/repos/{}/commits/{}", self.repo, sha))
                .await?;
            for file in detail["files"].as_array().into_iter().flatten() {
                let filename = file["filename"].as_str().unwrap_or_default().to_string();
                let status = file["status"].as_str().unwrap_or("modified").to_string();
                file_states.retain(|(name, _)| *name != filename);
                file_states.push((filename, status));
            }
        }
        debug!(repo = %self.repo, files = file_states.len(), "github changes collected");

        let mut changes = Vec::new();
        for (filename, status) in file_states {
            match status.as_str() {
                "removed" => changes.push(Change::Deleted {
                    external_id: filename,
                }),
                "added" => {
                    let (document, content) = self.fetch_file(&filename).await?;
                    changes.push(Change::Added { document, content });
                }
                _ => {
                    let (document, content) = self.fetch_file(&filename).await?;
                    changes.push(Change::Modified { document, content });
                }
            }
        }

        let next_cursor = newest
            .map(|d| d.to_rfc3339())
            .or_else(|| cursor.map(str::to_string))
            .unwrap_or_default();
        Ok(ChangeBatch {
            changes,
            next_cursor,
        })
    }
}

/// Best-effort MIME from a file extension
fn mime_for(path: &str) -> String {
    match path.rsplit('.').next().unwrap_or("") {
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "yml" | "yaml" => "application/yaml",
        "rs" | "go" | "py" | "js" | "ts" | "java" | "c" | "h" | "cpp" | "rb" | "sh" | "toml" => {
            "text/plain"
        }
        _ => "text/plain",
    }
    .to_string()
}
