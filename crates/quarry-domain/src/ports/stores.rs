//! Store ports
//!
//! External transactional stores. Each store exclusively owns its rows;
//! multi-row mutations follow the canonical orders documented on the
//! sync pipeline so a crash never leaves a chunk without its document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    AiSettings, Chunk, Document, Installation, InstallationSecrets, InstallationSummary,
    ProviderConfig, ScheduledTask, Session, Settings, Source, SyncState, User, VespaConfig,
};
use crate::error::Result;

/// User rows, unique by email
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn save(&self, user: &User) -> Result<()>;
    async fn get(&self, id: &str) -> Result<User>;
    async fn get_by_email(&self, email: &str) -> Result<User>;
    async fn list(&self, team_id: &str) -> Result<Vec<User>>;
    async fn delete(&self, id: &str) -> Result<()>;
    /// Number of users across all teams; gates one-shot setup
    async fn count(&self) -> Result<u64>;
}

/// Live sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Session>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn delete_for_user(&self, user_id: &str) -> Result<u64>;
}

/// Installation rows; secrets are sealed before the row hits storage
#[async_trait]
pub trait InstallationStore: Send + Sync {
    async fn save(&self, installation: &Installation) -> Result<()>;
    /// Full row with decrypted secrets
    async fn get(&self, id: &str) -> Result<Installation>;
    async fn get_by_account_id(&self, provider: &str, account_id: &str) -> Result<Installation>;
    async fn get_by_provider(&self, provider: &str) -> Result<Vec<Installation>>;
    /// Secret-free listing
    async fn list(&self) -> Result<Vec<InstallationSummary>>;
    async fn update_secrets(
        &self,
        id: &str,
        secrets: &InstallationSecrets,
        oauth_expiry: Option<DateTime<Utc>>,
    ) -> Result<()>;
    async fn update_last_used(&self, id: &str) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Provider OAuth app configurations, unique by provider type
#[async_trait]
pub trait ProviderConfigStore: Send + Sync {
    async fn save(&self, config: &ProviderConfig) -> Result<()>;
    async fn get(&self, provider_type: &str) -> Result<ProviderConfig>;
    async fn list(&self) -> Result<Vec<ProviderConfig>>;
    async fn delete(&self, provider_type: &str) -> Result<()>;
}

/// Source rows, unique by `(team_id, name)`
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn save(&self, source: &Source) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Source>;
    async fn get_by_name(&self, team_id: &str, name: &str) -> Result<Source>;
    async fn list(&self, team_id: &str) -> Result<Vec<Source>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Sync state rows, 1:1 with sources
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    async fn save(&self, state: &SyncState) -> Result<()>;
    async fn get(&self, source_id: &str) -> Result<SyncState>;
    async fn list(&self) -> Result<Vec<SyncState>>;
    async fn delete(&self, source_id: &str) -> Result<()>;
}

/// Document rows, unique by `(source_id, external_id)`
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Upsert by `(source_id, external_id)`; returns true when inserted
    async fn save(&self, document: &Document) -> Result<bool>;
    async fn get(&self, id: &str) -> Result<Document>;
    async fn get_by_external_id(&self, source_id: &str, external_id: &str) -> Result<Document>;
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Document>>;
    async fn list_by_source(&self, source_id: &str) -> Result<Vec<Document>>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn delete_by_source(&self, source_id: &str) -> Result<u64>;
    async fn count(&self) -> Result<u64>;
}

/// Chunk rows; replacement is all-or-nothing per document
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Replace all chunks of the document the batch belongs to
    async fn save_batch(&self, document_id: &str, chunks: &[Chunk]) -> Result<()>;
    async fn get_by_document(&self, document_id: &str) -> Result<Vec<Chunk>>;
    async fn delete_by_document(&self, document_id: &str) -> Result<u64>;
    async fn delete_by_source(&self, source_id: &str) -> Result<u64>;
    async fn count(&self) -> Result<u64>;
}

/// Team settings rows
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn save(&self, settings: &Settings) -> Result<()>;
    async fn get(&self, team_id: &str) -> Result<Settings>;
    async fn save_ai(&self, team_id: &str, ai: &AiSettings) -> Result<()>;
    async fn get_ai(&self, team_id: &str) -> Result<AiSettings>;
}

/// Engine schema configuration row (a singleton)
#[async_trait]
pub trait VespaConfigStore: Send + Sync {
    async fn save(&self, config: &VespaConfig) -> Result<()>;
    async fn get(&self) -> Result<VespaConfig>;
}

/// Recurring scheduler entries
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn save(&self, task: &ScheduledTask) -> Result<()>;
    async fn get(&self, id: &str) -> Result<ScheduledTask>;
    async fn list(&self) -> Result<Vec<ScheduledTask>>;
    async fn update_next_run(
        &self,
        id: &str,
        last_run: DateTime<Utc>,
        next_run: DateTime<Utc>,
    ) -> Result<()>;
}
