//! Exposed services
//!
//! One struct per driving port. Dependencies arrive as `Arc<dyn Port>`
//! through the constructor; every method takes the caller's
//! [`quarry_domain::entities::AuthContext`] except the login path that
//! produces it.

mod auth;
mod documents;
mod installations;
mod oauth;
mod providers;
mod search;
mod settings;
mod sources;
mod users;
mod vespa_admin;

pub use auth::{AuthService, AuthSession};
pub use documents::{DocumentService, DocumentSummary};
pub use installations::InstallationService;
pub use oauth::{AuthorizeOutcome, OAuthCoordinator};
pub use providers::{ProviderService, UpsertProviderConfig};
pub use search::SearchService;
pub use settings::{AiProviderFactory, SettingsService, UpdateAiSettings};
pub use sources::{CreateSource, SourceService, UpdateSource};
pub use users::{CreateUser, UserService};
pub use vespa_admin::VespaAdminService;

#[cfg(test)]
pub(crate) mod testsupport;
