//! Value objects
//!
//! Transient, identity-free types that flow between components.

mod change;
mod cursor;
mod search;
mod sync;

pub use change::{Change, DocumentMeta, FetchedDocument};
pub use cursor::CursorMap;
pub use search::{
    RankedChunk, ScoredChunk, SearchFilter, SearchHits, SearchMode, SearchOptions, SearchRequest,
    SearchResponse,
};
pub use sync::{SyncResult, SyncStats};
