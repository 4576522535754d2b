//! Core constants shared across the platform

use std::time::Duration;

/// Maximum chunk size in characters
pub const MAX_CHUNK_SIZE: usize = 1000;

/// Overlap between adjacent chunks in characters
pub const CHUNK_OVERLAP: usize = 200;

/// Fraction of the window searched backwards for a sentence boundary
pub const CHUNK_BOUNDARY_WINDOW: f64 = 0.2;

/// Number of chunk texts sent per embedding request
pub const EMBED_BATCH_SIZE: usize = 100;

/// Retries for a failed embedding batch
pub const EMBED_BATCH_RETRIES: u32 = 3;

/// Initial backoff between embedding retries; doubles each attempt
pub const EMBED_RETRY_BASE: Duration = Duration::from_millis(250);

/// Delivery attempts before a task is parked as failed
pub const TASK_MAX_ATTEMPTS: u32 = 3;

/// Ceiling for task retry backoff
pub const TASK_BACKOFF_CAP: Duration = Duration::from_secs(300);

/// Lease before a dequeued-but-unacked task returns to pending
pub const TASK_RECLAIM_TIMEOUT: Duration = Duration::from_secs(300);

/// TTL of the per-source sync lock
pub const SYNC_LOCK_TTL: Duration = Duration::from_secs(300);

/// Interval between sync lock extensions while a sync is active
pub const SYNC_LOCK_EXTEND_EVERY: Duration = Duration::from_secs(60);

/// TTL of the scheduler leader lock, extended on every tick
pub const SCHEDULER_LEADER_TTL: Duration = Duration::from_secs(30);

/// Upper bound on the scheduler evaluation interval
pub const SCHEDULER_TICK: Duration = Duration::from_secs(30);

/// Default interval of the seeded document-sync schedule
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(3600);

/// OAuth authorization attempts expire after this long
pub const OAUTH_STATE_TTL: Duration = Duration::from_secs(600);

/// Tokens within this window of expiry are refreshed before use
pub const TOKEN_REFRESH_LEEWAY: Duration = Duration::from_secs(300);

/// Maximum length of an opaque sync cursor in bytes
pub const CURSOR_MAX_LEN: usize = 4096;

/// Deadline for a connector change fetch
pub const CONNECTOR_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for one embedding batch
pub const EMBED_BATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for one index batch
pub const INDEX_BATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for health probes
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default page size for search results
pub const DEFAULT_RESULTS_PER_PAGE: usize = 20;

/// Hard ceiling on a search page
pub const MAX_RESULTS_PER_PAGE: usize = 100;

/// Lexical weight in hybrid score fusion
pub const HYBRID_LEXICAL_WEIGHT: f32 = 0.5;

/// Semantic weight in hybrid score fusion
pub const HYBRID_SEMANTIC_WEIGHT: f32 = 0.5;
