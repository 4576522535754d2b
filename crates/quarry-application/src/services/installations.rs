//! Installation service
//!
//! Admin surface over provider connections. Full installations with
//! secrets never leave the core; callers only ever see summaries.

use std::sync::Arc;

use tracing::info;

use quarry_domain::entities::{AuthContext, InstallationSummary};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{ConnectorFactory, InstallationStore, SourceStore};

pub struct InstallationService {
    installations: Arc<dyn InstallationStore>,
    sources: Arc<dyn SourceStore>,
    factory: Arc<dyn ConnectorFactory>,
}

impl InstallationService {
    pub fn new(
        installations: Arc<dyn InstallationStore>,
        sources: Arc<dyn SourceStore>,
        factory: Arc<dyn ConnectorFactory>,
    ) -> Self {
        Self {
            installations,
            sources,
            factory,
        }
    }

    pub async fn list(&self, ctx: &AuthContext) -> Result<Vec<InstallationSummary>> {
        ctx.require_member()?;
        let mut summaries = self.installations.list().await?;
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    pub async fn get(&self, ctx: &AuthContext, id: &str) -> Result<InstallationSummary> {
        ctx.require_member()?;
        Ok(self.installations.get(id).await?.summary())
    }

    /// Remove an installation no source references
    pub async fn delete(&self, ctx: &AuthContext, id: &str) -> Result<()> {
        ctx.require_admin()?;
        let installation = self.installations.get(id).await?;
        let in_use = self
            .sources
            .list(&ctx.team_id)
            .await?
            .into_iter()
            .any(|s| s.installation_id == id);
        if in_use {
            return Err(Error::invalid_input(format!(
                "installation {} is referenced by a source",
                installation.name
            )));
        }
        self.installations.delete(id).await?;
        info!(installation_id = %id, "installation deleted");
        Ok(())
    }

    /// Probe the installation's credentials against the provider
    pub async fn test_connection(&self, ctx: &AuthContext, id: &str) -> Result<()> {
        ctx.require_member()?;
        let connector = self.factory.create_for_installation(id, "").await?;
        connector.test_connection().await?;
        self.installations.update_last_used(id).await
    }
}
