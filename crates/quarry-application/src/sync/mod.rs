//! Sync pipeline
//!
//! The orchestrator runs per-source pipelines under a distributed lock,
//! the scheduler produces periodic tasks, the worker pool consumes the
//! task queue and drives the orchestrator.

mod orchestrator;
mod scheduler;
mod worker;

pub use orchestrator::SyncOrchestrator;
pub use scheduler::Scheduler;
pub use worker::SyncWorker;
