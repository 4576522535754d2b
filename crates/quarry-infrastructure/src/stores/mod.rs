//! In-memory store backends
//!
//! Development and test backends for the store ports. Storage is
//! in-memory but the visible semantics are the production ones:
//! uniqueness constraints hold, credentials are sealed through the
//! SecretBox before a row is kept, and summaries never carry secrets.

mod admin;
mod connect;
mod content;
mod identity;

pub use admin::{InMemoryScheduleStore, InMemorySettingsStore, InMemoryVespaConfigStore};
pub use connect::{InMemoryInstallationStore, InMemoryProviderConfigStore};
pub use content::{
    InMemoryChunkStore, InMemoryDocumentStore, InMemorySourceStore, InMemorySyncStateStore,
};
pub use identity::{InMemorySessionStore, InMemoryUserStore};
