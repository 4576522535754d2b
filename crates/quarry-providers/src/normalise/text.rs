//! Plain text normaliser and whitespace cleanup

use quarry_domain::error::Result;
use quarry_domain::ports::Normaliser;

/// Identity normaliser for anything under `text/*`
///
/// The wildcard fallback when no format-specific normaliser claims the
/// MIME type.
pub struct PlainTextNormaliser;

impl Normaliser for PlainTextNormaliser {
    fn supported_types(&self) -> Vec<String> {
        vec!["text/*".into(), "application/json".into(), "application/yaml".into()]
    }

    fn priority(&self) -> i32 {
        0
    }

    fn normalise(&self, content: &str, _mime_type: &str) -> Result<String> {
        Ok(content.to_string())
    }
}

/// Whitespace settling applied after every primary normaliser
///
/// CRLF becomes LF, trailing space goes, runs of blank lines collapse
/// to one, and horizontal whitespace inside a line collapses to single
/// spaces.
pub struct WhitespaceCleanup;

impl Normaliser for WhitespaceCleanup {
    fn supported_types(&self) -> Vec<String> {
        vec!["*/*".into()]
    }

    fn priority(&self) -> i32 {
        0
    }

    fn normalise(&self, content: &str, _mime_type: &str) -> Result<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut blank_run = 0usize;
        for line in content.replace("\r\n", "\n").replace('\r', "\n").lines() {
            let settled = line
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if settled.is_empty() {
                blank_run += 1;
                if blank_run == 1 && !lines.is_empty() {
                    lines.push(String::new());
                }
            } else {
                blank_run = 0;
                lines.push(settled);
            }
        }
        while lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        Ok(lines.join("\n"))
    }
}
