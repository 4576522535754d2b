//! In-memory connector
//!
//! Deterministic connector for development and integration tests.
//! Change batches are scripted per container and handed out one per
//! fetch; a drained script reports no changes and echoes the cursor.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;

use quarry_domain::entities::Source;
use quarry_domain::error::{Error, Result};
use quarry_domain::ids::content_hash;
use quarry_domain::ports::{
    ChangeBatch, Connector, ConnectorBuilder, OAuthDefaults, TokenProvider,
};
use quarry_domain::value_objects::{Change, FetchedDocument};

/// Scripted batches for one container
pub struct MemoryScript {
    batches: Mutex<VecDeque<Result<ChangeBatch>>>,
}

impl MemoryScript {
    pub fn new(batches: Vec<Result<ChangeBatch>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
        }
    }

    fn next(&self, cursor: Option<&str>) -> Result<ChangeBatch> {
        match self.batches.lock().unwrap().pop_front() {
            Some(batch) => batch,
            None => Ok(ChangeBatch {
                changes: vec![],
                next_cursor: cursor.unwrap_or_default().to_string(),
            }),
        }
    }
}

/// Builder for the `memory` provider
#[derive(Default)]
pub struct MemoryConnectorBuilder {
    scripts: DashMap<String, Arc<MemoryScript>>,
}

impl MemoryConnectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the change batches a container will emit
    pub fn script(&self, container_id: &str, batches: Vec<Result<ChangeBatch>>) {
        self.scripts
            .insert(container_id.to_string(), Arc::new(MemoryScript::new(batches)));
    }
}

impl ConnectorBuilder for MemoryConnectorBuilder {
    fn provider_type(&self) -> &str {
        "memory"
    }

    fn supports_oauth(&self) -> bool {
        false
    }

    fn oauth_defaults(&self) -> Option<OAuthDefaults> {
        None
    }

    fn supports_container_selection(&self) -> bool {
        true
    }

    fn build(
        &self,
        token_provider: Arc<dyn TokenProvider>,
        container_id: &str,
    ) -> Result<Arc<dyn Connector>> {
        let script = self
            .scripts
            .get(container_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| Arc::new(MemoryScript::new(vec![])));
        Ok(Arc::new(MemoryConnector {
            token_provider,
            script,
        }))
    }
}

struct MemoryConnector {
    token_provider: Arc<dyn TokenProvider>,
    script: Arc<MemoryScript>,
}

#[async_trait]
impl Connector for MemoryConnector {
    fn provider_type(&self) -> &str {
        "memory"
    }

    fn validate_config(&self, _source: &Source) -> Result<()> {
        Ok(())
    }

    async fn test_connection(&self) -> Result<()> {
        self.token_provider.access_token().await.map(|_| ())
    }

    async fn fetch_document(&self, external_id: &str) -> Result<FetchedDocument> {
        // The script only carries change streams; single fetches look
        // through pending batches for the document.
        let batches = self.script.batches.lock().unwrap();
        for batch in batches.iter().flatten() {
            for change in &batch.changes {
                if change.external_id() != external_id {
                    continue;
                }
                if let Change::Added { document, content }
                | Change::Modified { document, content } = change
                {
                    return Ok(FetchedDocument {
                        meta: document.clone(),
                        content: content.clone(),
                        content_hash: content_hash(content.as_bytes()),
                    });
                }
            }
        }
        Err(Error::not_found(format!("document {}", external_id)))
    }

    async fn fetch_changes(&self, _source: &Source, cursor: Option<&str>) -> Result<ChangeBatch> {
        self.token_provider.access_token().await?;
        self.script.next(cursor)
    }
}
