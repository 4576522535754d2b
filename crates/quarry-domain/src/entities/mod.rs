//! Domain entities
//!
//! Rows owned by the platform stores. Cross-entity references are by id
//! only; no entity holds an owning pointer into another store.

mod document;
mod installation;
mod provider_config;
mod source;
mod sync_state;
mod task;
mod user;
mod settings;
mod vespa;

pub use document::{Chunk, Document};
pub use installation::{AuthMethod, Installation, InstallationSecrets, InstallationSummary};
pub use provider_config::{ProviderConfig, ProviderConfigSummary, ProviderSecrets};
pub use source::Source;
pub use sync_state::{SyncState, SyncStatus};
pub use task::{ScheduledTask, Task, TaskStatus, TaskType};
pub use user::{AuthContext, Role, Session, User, UserSummary};
pub use settings::{
    AiProvider, AiProviderConfig, AiRoleSummary, AiSettings, AiSettingsStatus, AiSettingsSummary,
    Settings,
};
pub use vespa::{SchemaMode, VespaConfig, VespaStatus};
