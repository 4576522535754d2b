//! Application layer for Quarry
//!
//! Exposed services (auth, users, sources, documents, search, settings,
//! installations, providers, oauth, engine admin), the sync pipeline
//! (orchestrator, scheduler, worker) and the chunking/normalisation
//! machinery. Everything here talks to the outside world through the
//! ports defined in `quarry-domain`.

pub mod chunking;
pub mod normalise;
pub mod runtime;
pub mod services;
pub mod sync;
