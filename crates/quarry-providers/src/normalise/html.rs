//! HTML normaliser

use regex::Regex;

use quarry_domain::error::Result;
use quarry_domain::ports::Normaliser;

/// Tag-stripping HTML to plain text
///
/// Script and style elements disappear with their content; block-level
/// closings become line breaks so paragraphs stay separated.
pub struct HtmlNormaliser {
    script_style: Regex,
    block_end: Regex,
    tag: Regex,
}

impl HtmlNormaliser {
    pub fn new() -> Self {
        Self {
            script_style: Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>")
                .expect("static regex"),
            block_end: Regex::new(r"(?i)</(p|div|h[1-6]|li|tr|blockquote|section|article)>|<br\s*/?>")
                .expect("static regex"),
            tag: Regex::new(r"(?s)<[^>]+>").expect("static regex"),
        }
    }
}

impl Default for HtmlNormaliser {
    fn default() -> Self {
        Self::new()
    }
}

impl Normaliser for HtmlNormaliser {
    fn supported_types(&self) -> Vec<String> {
        vec!["text/html".into(), "application/xhtml+xml".into()]
    }

    fn priority(&self) -> i32 {
        10
    }

    fn normalise(&self, content: &str, _mime_type: &str) -> Result<String> {
        let without_scripts = self.script_style.replace_all(content, "");
        let with_breaks = self.block_end.replace_all(&without_scripts, "\n");
        let text = self.tag.replace_all(&with_breaks, " ");
        Ok(decode_entities(&text))
    }
}

/// Decode the handful of entities that matter for search text
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_decodes_entities() {
        let normaliser = HtmlNormaliser::new();
        let out = normaliser
            .normalise(
                "<h1>Q&amp;A</h1><p>ops &lt;guide&gt;</p>",
                "text/html",
            )
            .unwrap();
        assert!(out.contains("Q&A"));
        assert!(out.contains("ops <guide>"));
        assert!(!out.contains("<h1>"));
    }

    #[test]
    fn script_content_is_gone() {
        let normaliser = HtmlNormaliser::new();
        let out = normaliser
            .normalise(
                "<p>visible</p><script>var hidden = 1;</script><style>.a{}</style>",
                "text/html",
            )
            .unwrap();
        assert!(out.contains("visible"));
        assert!(!out.contains("hidden"));
        assert!(!out.contains(".a{}"));
    }
}
