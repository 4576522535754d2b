//! Infrastructure layer for Quarry
//!
//! Concrete backends for the domain ports: configuration loading,
//! structured logging, the SecretBox and auth crypto, the distributed
//! lock, the durable task queue, the OAuth state store and the
//! in-memory stores used in development and tests.

pub mod config;
pub mod crypto;
pub mod lock;
pub mod logging;
pub mod oauth_state;
pub mod queue;
pub mod stores;
