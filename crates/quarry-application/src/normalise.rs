//! Normaliser registry
//!
//! Routes document content to a normaliser by MIME type. Exact types
//! beat wildcard patterns, then higher priority wins; `text/markdown`
//! is therefore tried before a `text/*` fallback. Post-processors run
//! after the primary normaliser in priority order.

use std::sync::Arc;

use quarry_domain::error::Result;
use quarry_domain::ports::Normaliser;

/// MIME-routed normaliser registry
#[derive(Default)]
pub struct NormaliserRegistry {
    normalisers: Vec<Arc<dyn Normaliser>>,
    post_processors: Vec<Arc<dyn Normaliser>>,
}

impl NormaliserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a primary normaliser
    pub fn register(&mut self, normaliser: Arc<dyn Normaliser>) {
        self.normalisers.push(normaliser);
    }

    /// Register a post-processing stage applied after the primary pass
    pub fn register_post_processor(&mut self, normaliser: Arc<dyn Normaliser>) {
        self.post_processors.push(normaliser);
        self.post_processors
            .sort_by_key(|n| std::cmp::Reverse(n.priority()));
    }

    /// Pick the normaliser for a MIME type
    pub fn route(&self, mime_type: &str) -> Option<Arc<dyn Normaliser>> {
        self.normalisers
            .iter()
            .filter_map(|n| {
                n.supported_types()
                    .iter()
                    .filter_map(|pattern| match_specificity(pattern, mime_type))
                    .max()
                    .map(|spec| (spec, n.priority(), n.clone()))
            })
            // Specificity first, then declared priority
            .max_by_key(|(spec, priority, _)| (*spec, *priority))
            .map(|(_, _, n)| n)
    }

    /// Normalise content for indexing
    ///
    /// Unroutable MIME types pass through unchanged; post-processors
    /// still run so whitespace cleanup applies everywhere.
    pub fn normalise(&self, content: &str, mime_type: &str) -> Result<String> {
        let mut text = match self.route(mime_type) {
            Some(normaliser) => normaliser.normalise(content, mime_type)?,
            None => content.to_string(),
        };
        for stage in &self.post_processors {
            text = stage.normalise(&text, mime_type)?;
        }
        Ok(text)
    }
}

/// How specifically `pattern` matches `mime_type`
///
/// Exact match ranks above a prefix wildcard; longer prefixes rank above
/// shorter ones; `*/*` matches everything at the lowest rank.
fn match_specificity(pattern: &str, mime_type: &str) -> Option<usize> {
    if pattern == mime_type {
        return Some(usize::MAX);
    }
    if pattern == "*/*" {
        return Some(0);
    }
    if let Some(prefix) = pattern.strip_suffix("/*") {
        if mime_type.starts_with(prefix)
            && mime_type.as_bytes().get(prefix.len()) == Some(&b'/')
        {
            return Some(prefix.len());
        }
    }
    None
}
