//! Provider connectors
//!
//! The closed set of connector builders, the registry-backed factory
//! that resolves sources into live connectors, and the token provider
//! that keeps OAuth credentials fresh underneath them.

mod github;
mod memory;
mod registry;
mod token;

pub use github::GitHubConnectorBuilder;
pub use memory::{MemoryConnectorBuilder, MemoryScript};
pub use registry::{ConnectorRegistry, RegistryConnectorFactory};
pub use token::OAuthTokenProvider;
