//! Windowed text chunking
//!
//! Splits normalised text into overlapping windows for indexing. The
//! window prefers to end at a sentence boundary inside its final fifth,
//! so chunks usually break on prose seams rather than mid-sentence.
//! Offsets are character indices into the normalised text.

use quarry_domain::constants::{CHUNK_BOUNDARY_WINDOW, CHUNK_OVERLAP, MAX_CHUNK_SIZE};
use quarry_domain::error::{Error, Result};

/// Chunking parameters
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Maximum window size in characters
    pub max_size: usize,
    /// Characters shared between adjacent windows
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_size: MAX_CHUNK_SIZE,
            overlap: CHUNK_OVERLAP,
        }
    }
}

/// One produced window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPiece {
    pub content: String,
    pub start_char: usize,
    pub end_char: usize,
    pub position: u32,
}

/// Sliding-window chunker
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        // The boundary zone and the overlap must both fit inside a
        // window with room to advance, or the walk stalls.
        let boundary_zone = (config.max_size as f64 * CHUNK_BOUNDARY_WINDOW) as usize;
        if config.max_size == 0 || config.overlap + boundary_zone >= config.max_size {
            return Err(Error::invalid_input(format!(
                "overlap {} too large for window {}",
                config.overlap, config.max_size
            )));
        }
        Ok(Self { config })
    }

    /// Split `content` into overlapping windows
    ///
    /// Positions are dense from 0. Empty input yields no chunks.
    pub fn chunk(&self, content: &str) -> Vec<ChunkPiece> {
        let chars: Vec<char> = content.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        let mut start = 0usize;
        let mut position = 0u32;

        loop {
            let hard_end = (start + self.config.max_size).min(chars.len());
            let end = if hard_end < chars.len() {
                self.boundary_before(&chars, start, hard_end)
            } else {
                hard_end
            };

            pieces.push(ChunkPiece {
                content: chars[start..end].iter().collect(),
                start_char: start,
                end_char: end,
                position,
            });

            if end >= chars.len() {
                break;
            }
            start = end - self.config.overlap;
            position += 1;
        }

        pieces
    }

    /// Nearest sentence boundary inside the window's final fifth, or the
    /// hard end when none exists
    fn boundary_before(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let window_len = hard_end - start;
        let zone_start = hard_end - (window_len as f64 * CHUNK_BOUNDARY_WINDOW) as usize;

        for i in (zone_start..hard_end).rev() {
            if is_sentence_end(chars, i) {
                return i + 1;
            }
        }
        hard_end
    }
}

/// Whether `chars[i]` terminates a sentence
fn is_sentence_end(chars: &[char], i: usize) -> bool {
    let c = chars[i];
    if c == '\n' {
        return true;
    }
    if !matches!(c, '.' | '!' | '?') {
        return false;
    }
    // Terminator must be followed by whitespace or end of text,
    // otherwise "v1.2" style tokens would split.
    chars.get(i + 1).map_or(true, |next| next.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig { max_size, overlap }).unwrap()
    }

    #[test]
    fn short_content_is_one_chunk() {
        let pieces = Chunker::default().chunk("hello world");
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].content, "hello world");
        assert_eq!(pieces[0].start_char, 0);
        assert_eq!(pieces[0].end_char, 11);
        assert_eq!(pieces[0].position, 0);
    }

    #[test]
    fn empty_content_yields_nothing() {
        assert!(Chunker::default().chunk("").is_empty());
    }

    #[test]
    fn positions_are_dense_and_offsets_overlap() {
        let text = "a".repeat(2500);
        let pieces = chunker(1000, 200).chunk(&text);
        assert!(pieces.len() >= 3);
        for (i, piece) in pieces.iter().enumerate() {
            assert_eq!(piece.position as usize, i);
            assert!(piece.start_char <= piece.end_char);
        }
        for pair in pieces.windows(2) {
            assert_eq!(pair[1].start_char, pair[0].end_char - 200);
        }
    }

    #[test]
    fn overlap_stripped_reconstructs_content() {
        let sentence = "The quick brown fox jumps over the lazy dog. ";
        let text = sentence.repeat(120);
        let pieces = chunker(1000, 200).chunk(&text);

        let chars: Vec<char> = text.chars().collect();
        let mut rebuilt = String::new();
        let mut covered = 0usize;
        for piece in &pieces {
            assert!(piece.start_char <= covered);
            let fresh: String = chars[covered..piece.end_char].iter().collect();
            rebuilt.push_str(&fresh);
            covered = piece.end_char;
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn windows_prefer_sentence_boundaries() {
        let sentence = "Sentences end with a period and a space. ";
        let text = sentence.repeat(60);
        let pieces = chunker(1000, 200).chunk(&text);
        // Every non-final window should have broken on a terminator.
        for piece in &pieces[..pieces.len() - 1] {
            let trimmed = piece.content.trim_end();
            assert!(
                trimmed.ends_with('.'),
                "window did not end at a sentence: ...{:?}",
                &trimmed[trimmed.len().saturating_sub(20)..]
            );
        }
    }

    #[test]
    fn degenerate_config_is_rejected() {
        assert!(Chunker::new(ChunkerConfig {
            max_size: 100,
            overlap: 90,
        })
        .is_err());
        assert!(Chunker::new(ChunkerConfig {
            max_size: 0,
            overlap: 0,
        })
        .is_err());
    }
}
