//! Markdown normaliser

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use quarry_domain::error::Result;
use quarry_domain::ports::Normaliser;

/// Markdown to plain text via pulldown-cmark
///
/// Keeps the prose and code content, drops the markup. Links keep
/// their text; images keep their alt text.
pub struct MarkdownNormaliser {
    options: Options,
}

impl MarkdownNormaliser {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl Default for MarkdownNormaliser {
    fn default() -> Self {
        Self::new()
    }
}

impl Normaliser for MarkdownNormaliser {
    fn supported_types(&self) -> Vec<String> {
        vec!["text/markdown".into(), "text/x-markdown".into()]
    }

    fn priority(&self) -> i32 {
        10
    }

    fn normalise(&self, content: &str, _mime_type: &str) -> Result<String> {
        let mut out = String::with_capacity(content.len());
        for event in Parser::new_ext(content, self.options) {
            match event {
                Event::Text(text) | Event::Code(text) => out.push_str(&text),
                Event::SoftBreak | Event::HardBreak => out.push('\n'),
                Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Heading(_))
                | Event::End(TagEnd::Item)
                | Event::End(TagEnd::CodeBlock)
                | Event::End(TagEnd::BlockQuote(_)) => out.push_str("\n\n"),
                Event::End(TagEnd::TableCell) => out.push(' '),
                Event::End(TagEnd::TableRow) => out.push('\n'),
                Event::Start(Tag::Item) => out.push_str("- "),
                _ => {}
            }
        }
        Ok(out)
    }
}
