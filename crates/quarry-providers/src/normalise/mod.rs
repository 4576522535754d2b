//! Content normalisers
//!
//! Turn provider content into plain text ready for chunking: markdown
//! and HTML lose their markup, everything gets its whitespace settled
//! by the post-processing pass.

mod html;
mod markdown;
mod text;

pub use html::HtmlNormaliser;
pub use markdown::MarkdownNormaliser;
pub use text::{PlainTextNormaliser, WhitespaceCleanup};

use std::sync::Arc;

use quarry_application::normalise::NormaliserRegistry;

/// Registry with the standard normaliser set
pub fn default_registry() -> NormaliserRegistry {
    let mut registry = NormaliserRegistry::new();
    registry.register(Arc::new(MarkdownNormaliser::new()));
    registry.register(Arc::new(HtmlNormaliser::new()));
    registry.register(Arc::new(PlainTextNormaliser));
    registry.register_post_processor(Arc::new(WhitespaceCleanup));
    registry
}
