//! Search engine adapters
//!
//! The Vespa HTTP adapter and deployer for production, and an
//! in-memory engine with the same query semantics for development and
//! tests.

mod memory;
mod vespa;
mod vespa_admin;

pub use memory::InMemorySearchEngine;
pub use vespa::VespaSearchEngine;
pub use vespa_admin::HttpVespaDeployer;
