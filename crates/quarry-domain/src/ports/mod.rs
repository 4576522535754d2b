//! Driven ports
//!
//! Contracts the core consumes. Infrastructure and provider crates
//! implement them; services depend only on these traits.

mod connector;
mod crypto;
mod deployer;
mod embedding;
mod llm;
mod lock;
mod normalise;
mod oauth;
mod queue;
mod search_engine;
mod stores;

pub use connector::{
    ChangeBatch, Connector, ConnectorBuilder, ConnectorFactory, OAuthDefaults, TokenProvider,
};
pub use crypto::{AuthAdapter, SealedSecret, SecretBox};
pub use deployer::{ApplicationPackage, DeployOutcome, VespaDeployer};
pub use embedding::EmbeddingService;
pub use llm::LlmService;
pub use lock::{DistributedLock, LockLease};
pub use normalise::Normaliser;
pub use oauth::{OAuthExchanger, OAuthStateData, OAuthStateStore, OAuthUserInfo, TokenResponse};
pub use queue::{QueueStats, TaskFilter, TaskQueue};
pub use search_engine::SearchEngine;
pub use stores::{
    ChunkStore, DocumentStore, InstallationStore, ProviderConfigStore, ScheduleStore,
    SessionStore, SettingsStore, SourceStore, SyncStateStore, UserStore, VespaConfigStore,
};
