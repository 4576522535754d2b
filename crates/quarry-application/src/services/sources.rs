//! Source management service
//!
//! CRUD for the containers a team indexes, plus the sync trigger that
//! feeds the task queue. Nothing here talks to providers directly; the
//! connector factory validates reachability when a sync runs.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use quarry_domain::entities::{AuthContext, Source, SyncState, Task, TaskType};
use quarry_domain::error::{Error, ErrorKind, Result};
use quarry_domain::ids::new_id;
use quarry_domain::ports::{
    InstallationStore, SourceStore, SyncStateStore, TaskQueue,
};

/// Priority of operator-triggered syncs, above the scheduler's default
const TRIGGER_PRIORITY: i8 = 50;

/// Request to create a source
#[derive(Debug, Clone)]
pub struct CreateSource {
    pub name: String,
    pub provider_type: String,
    pub installation_id: String,
    pub config: serde_json::Value,
    pub selected_containers: Vec<String>,
}

/// Partial source update
#[derive(Debug, Clone, Default)]
pub struct UpdateSource {
    pub name: Option<String>,
    pub config: Option<serde_json::Value>,
    pub selected_containers: Option<Vec<String>>,
    pub enabled: Option<bool>,
}

/// Source CRUD and sync triggering
pub struct SourceService {
    sources: Arc<dyn SourceStore>,
    sync_states: Arc<dyn SyncStateStore>,
    installations: Arc<dyn InstallationStore>,
    queue: Arc<dyn TaskQueue>,
}

impl SourceService {
    pub fn new(
        sources: Arc<dyn SourceStore>,
        sync_states: Arc<dyn SyncStateStore>,
        installations: Arc<dyn InstallationStore>,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        Self {
            sources,
            sync_states,
            installations,
            queue,
        }
    }

    /// Create a source; name unique per team, installation must exist
    pub async fn create(&self, ctx: &AuthContext, req: CreateSource) -> Result<Source> {
        ctx.require_member()?;
        if req.name.trim().is_empty() {
            return Err(Error::invalid_input("source name must not be empty"));
        }
        match self.sources.get_by_name(&ctx.team_id, &req.name).await {
            Ok(_) => return Err(Error::already_exists(format!("source {}", req.name))),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        // Reject dangling installation references up front
        let installation = self.installations.get(&req.installation_id).await?;
        if installation.provider_type != req.provider_type {
            return Err(Error::invalid_input(format!(
                "installation {} belongs to provider {}",
                req.installation_id, installation.provider_type
            )));
        }

        let now = Utc::now();
        let source = Source {
            id: new_id(),
            team_id: ctx.team_id.clone(),
            name: req.name,
            provider_type: req.provider_type,
            config: req.config,
            installation_id: req.installation_id,
            selected_containers: req.selected_containers,
            enabled: true,
            created_by: ctx.user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.sources.save(&source).await?;
        self.sync_states.save(&SyncState::new(&source.id)).await?;
        info!(source_id = %source.id, provider = %source.provider_type, "source created");
        Ok(source)
    }

    pub async fn get(&self, ctx: &AuthContext, id: &str) -> Result<Source> {
        let source = self.sources.get(id).await?;
        self.check_team(ctx, &source)?;
        Ok(source)
    }

    pub async fn list(&self, ctx: &AuthContext) -> Result<Vec<Source>> {
        let mut sources = self.sources.list(&ctx.team_id).await?;
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sources)
    }

    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: &str,
        req: UpdateSource,
    ) -> Result<Source> {
        ctx.require_member()?;
        let mut source = self.sources.get(id).await?;
        self.check_team(ctx, &source)?;

        if let Some(name) = req.name {
            if name.trim().is_empty() {
                return Err(Error::invalid_input("source name must not be empty"));
            }
            match self.sources.get_by_name(&ctx.team_id, &name).await {
                Ok(existing) if existing.id != source.id => {
                    return Err(Error::already_exists(format!("source {}", name)));
                }
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
                _ => {}
            }
            source.name = name;
        }
        if let Some(config) = req.config {
            source.config = config;
        }
        if let Some(containers) = req.selected_containers {
            source.selected_containers = containers;
        }
        if let Some(enabled) = req.enabled {
            source.enabled = enabled;
        }
        source.updated_at = Utc::now();
        self.sources.save(&source).await?;
        Ok(source)
    }

    /// Delete a source and its sync state
    ///
    /// Indexed documents are removed separately through the document
    /// service so engine and stores stay ordered.
    pub async fn delete(&self, ctx: &AuthContext, id: &str) -> Result<()> {
        ctx.require_admin()?;
        let source = self.sources.get(id).await?;
        self.check_team(ctx, &source)?;
        self.sync_states.delete(id).await?;
        self.sources.delete(id).await?;
        info!(source_id = %id, "source deleted");
        Ok(())
    }

    /// Enqueue a `sync_source` task for immediate delivery
    pub async fn trigger_sync(&self, ctx: &AuthContext, id: &str) -> Result<Task> {
        ctx.require_member()?;
        let source = self.sources.get(id).await?;
        self.check_team(ctx, &source)?;
        if !source.enabled {
            return Err(Error::invalid_input(format!("source {} is disabled", id)));
        }
        let task = Task::new(
            TaskType::SyncSource,
            &ctx.team_id,
            serde_json::json!({ "source_id": id }),
        )
        .with_priority(TRIGGER_PRIORITY);
        self.queue.enqueue(task.clone()).await?;
        info!(source_id = %id, task_id = %task.id, "sync triggered");
        Ok(task)
    }

    fn check_team(&self, ctx: &AuthContext, source: &Source) -> Result<()> {
        if source.team_id != ctx.team_id {
            return Err(Error::not_found(format!("source {}", source.id)));
        }
        Ok(())
    }
}
