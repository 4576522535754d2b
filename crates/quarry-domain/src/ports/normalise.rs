//! Normaliser port

use crate::error::Result;

/// Converts provider content into plain text ready for chunking
///
/// Registered normalisers are routed by MIME type; among several matches
/// the highest priority wins. Extraction of text from structured formats
/// is the normaliser's job; the pipeline only ever sees plain text.
pub trait Normaliser: Send + Sync {
    /// MIME types handled, exact (`text/markdown`) or prefix (`text/*`)
    fn supported_types(&self) -> Vec<String>;

    /// Routing priority; higher wins among matching normalisers
    fn priority(&self) -> i32;

    fn normalise(&self, content: &str, mime_type: &str) -> Result<String>;
}
