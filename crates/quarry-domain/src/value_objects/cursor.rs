//! Sync cursor encoding
//!
//! Cursors are opaque strings to everyone but the orchestrator, which
//! needs one continuation token per container. Single-container sources
//! store the bare provider token; multi-container sources store a JSON
//! object mapping container id to token.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::CURSOR_MAX_LEN;
use crate::error::{Error, Result};

/// Per-container continuation tokens for one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorMap(BTreeMap<String, String>);

impl CursorMap {
    /// Decode a persisted cursor string
    ///
    /// A JSON object is the multi-container form; anything else is the
    /// bare token of the source's single container.
    pub fn decode(raw: &str, default_container: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        if let Ok(map) = serde_json::from_str::<BTreeMap<String, String>>(raw) {
            return Self(map);
        }
        let mut map = BTreeMap::new();
        map.insert(default_container.to_string(), raw.to_string());
        Self(map)
    }

    /// Token for one container, if a previous sync recorded one
    pub fn get(&self, container: &str) -> Option<&str> {
        self.0.get(container).map(String::as_str)
    }

    /// Record the continuation token for one container
    pub fn set(&mut self, container: &str, token: String) {
        if token.is_empty() {
            self.0.remove(container);
        } else {
            self.0.insert(container.to_string(), token);
        }
    }

    /// Encode for persistence
    ///
    /// A single entry round-trips as the bare token; multiple entries
    /// become the JSON object form. Cursors above the size limit are
    /// rejected rather than truncated.
    pub fn encode(&self) -> Result<String> {
        let encoded = match self.0.len() {
            0 => String::new(),
            1 => self.0.values().next().cloned().unwrap_or_default(),
            _ => serde_json::to_string(&self.0)?,
        };
        if encoded.len() > CURSOR_MAX_LEN {
            return Err(Error::invalid_input(format!(
                "cursor exceeds {} bytes",
                CURSOR_MAX_LEN
            )));
        }
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_container_round_trips_bare() {
        let mut map = CursorMap::default();
        map.set("octocat/repo", "cursor-1".into());
        assert_eq!(map.encode().unwrap(), "cursor-1");

        let decoded = CursorMap::decode("cursor-1", "octocat/repo");
        assert_eq!(decoded.get("octocat/repo"), Some("cursor-1"));
    }

    #[test]
    fn multi_container_round_trips_as_object() {
        let mut map = CursorMap::default();
        map.set("a/one", "t1".into());
        map.set("b/two", "t2".into());
        let encoded = map.encode().unwrap();
        assert!(encoded.starts_with('{'));

        let decoded = CursorMap::decode(&encoded, "");
        assert_eq!(decoded, map);
    }

    #[test]
    fn empty_cursor_decodes_empty() {
        let map = CursorMap::decode("", "c");
        assert_eq!(map.get("c"), None);
        assert_eq!(map.encode().unwrap(), "");
    }

    #[test]
    fn oversized_cursor_is_rejected() {
        let mut map = CursorMap::default();
        map.set("c", "x".repeat(CURSOR_MAX_LEN + 1));
        assert!(map.encode().is_err());
    }
}
