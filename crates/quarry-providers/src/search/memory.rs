//! In-memory search engine
//!
//! Full query semantics without an external engine: term-frequency
//! lexical scoring, cosine nearest-neighbour over stored embeddings,
//! and 50/50 fusion with per-result-set score normalisation. Used in
//! development mode and as the integration-test engine.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use itertools::Itertools;

use quarry_domain::constants::{HYBRID_LEXICAL_WEIGHT, HYBRID_SEMANTIC_WEIGHT};
use quarry_domain::entities::{Chunk, Document, SchemaMode};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::SearchEngine;
use quarry_domain::value_objects::{ScoredChunk, SearchFilter, SearchHits, SearchMode, SearchOptions};

/// A chunk with the document fields the engine filters on
#[derive(Clone)]
struct IndexedChunk {
    chunk: Chunk,
    source_id: String,
    mime_type: String,
    updated_at: DateTime<Utc>,
}

/// DashMap-backed engine with the production query semantics
pub struct InMemorySearchEngine {
    chunks: DashMap<String, IndexedChunk>,
    schema_mode: Mutex<SchemaMode>,
}

impl InMemorySearchEngine {
    pub fn new() -> Self {
        Self {
            chunks: DashMap::new(),
            schema_mode: Mutex::new(SchemaMode::Hybrid),
        }
    }

    /// Pin the schema capability the engine reports
    ///
    /// A `Bm25` engine rejects vector queries exactly like a deployed
    /// lexical-only schema would.
    pub fn set_schema_mode(&self, mode: SchemaMode) {
        *self.schema_mode.lock().unwrap() = mode;
    }

    fn matches_filter(entry: &IndexedChunk, filter: &SearchFilter) -> bool {
        if !filter.source_ids.is_empty() && !filter.source_ids.contains(&entry.source_id) {
            return false;
        }
        if !filter.mime_types.is_empty() && !filter.mime_types.contains(&entry.mime_type) {
            return false;
        }
        if let Some(after) = filter.updated_after {
            if entry.updated_at < after {
                return false;
            }
        }
        if let Some(before) = filter.updated_before {
            if entry.updated_at > before {
                return false;
            }
        }
        true
    }

    /// Term-frequency lexical score; 0.0 means no match
    fn lexical_score(content: &str, terms: &[String]) -> f32 {
        let haystack = content.to_lowercase();
        let mut score = 0.0;
        for term in terms {
            let count = haystack.matches(term.as_str()).count();
            if count > 0 {
                // Diminishing returns per extra occurrence
                score += 1.0 + (count as f32).ln();
            }
        }
        score
    }

    fn highlights(content: &str, terms: &[String]) -> Vec<String> {
        let haystack = content.to_lowercase();
        let mut snippets = Vec::new();
        for term in terms {
            if let Some(at) = haystack.find(term.as_str()) {
                // Window around the first occurrence, on char boundaries
                let start = ceil_char_boundary(content, at.saturating_sub(40));
                let end = floor_char_boundary(content, (at + term.len() + 40).min(content.len()));
                if start < end {
                    snippets.push(content[start..end].trim().to_string());
                }
            }
            if snippets.len() >= 3 {
                break;
            }
        }
        snippets
    }

    /// Paginate scored results, ordering by score then recency
    fn paginate(
        mut scored: Vec<(f32, IndexedChunk)>,
        opts: &SearchOptions,
        terms: &[String],
    ) -> SearchHits {
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.1.updated_at.cmp(&a.1.updated_at))
        });
        let total = scored.len() as u64;
        let hits = scored
            .into_iter()
            .skip(opts.offset)
            .take(opts.limit)
            .map(|(score, entry)| ScoredChunk {
                highlights: Self::highlights(&entry.chunk.content, terms),
                chunk: entry.chunk,
                score,
            })
            .collect();
        SearchHits { hits, total }
    }
}

impl Default for InMemorySearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchEngine for InMemorySearchEngine {
    async fn index(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        // Replace the document's chunk set wholesale
        self.chunks
            .retain(|_, entry| entry.chunk.document_id != document.id);
        for chunk in chunks {
            self.chunks.insert(
                chunk.id.clone(),
                IndexedChunk {
                    chunk: chunk.clone(),
                    source_id: document.source_id.clone(),
                    mime_type: document.mime_type.clone(),
                    updated_at: document.updated_at,
                },
            );
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        opts: &SearchOptions,
    ) -> Result<SearchHits> {
        if opts.mode.requires_embedding() {
            if !self.schema_mode.lock().unwrap().supports_embedding() {
                return Err(Error::invalid_input(
                    "deployed schema does not support vector queries",
                ));
            }
            if query_embedding.is_none() {
                return Err(Error::invalid_input("query embedding required"));
            }
        }

        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .unique()
            .collect();
        let candidates: Vec<IndexedChunk> = self
            .chunks
            .iter()
            .filter(|e| Self::matches_filter(e, &opts.filter))
            .map(|e| e.clone())
            .collect();

        let scored = match opts.mode {
            SearchMode::Text => candidates
                .into_iter()
                .filter_map(|entry| {
                    let score = Self::lexical_score(&entry.chunk.content, &terms);
                    (score > 0.0).then_some((score, entry))
                })
                .collect(),
            SearchMode::Semantic => {
                let query_vector = query_embedding.unwrap_or_default();
                candidates
                    .into_iter()
                    .filter_map(|entry| {
                        let vector = entry.chunk.embedding.as_deref()?;
                        Some((cosine_similarity(query_vector, vector), entry))
                    })
                    .collect()
            }
            SearchMode::Hybrid => {
                let query_vector = query_embedding.unwrap_or_default();
                let lexical: HashMap<String, f32> = candidates
                    .iter()
                    .map(|e| {
                        (
                            e.chunk.id.clone(),
                            Self::lexical_score(&e.chunk.content, &terms),
                        )
                    })
                    .collect();
                let semantic: HashMap<String, f32> = candidates
                    .iter()
                    .filter_map(|e| {
                        let vector = e.chunk.embedding.as_deref()?;
                        Some((e.chunk.id.clone(), cosine_similarity(query_vector, vector)))
                    })
                    .collect();

                // Normalise each score set to [0, 1] before fusing
                let lex_max = lexical.values().cloned().fold(0.0f32, f32::max);
                let sem_max = semantic.values().cloned().fold(0.0f32, f32::max);
                candidates
                    .into_iter()
                    .filter_map(|entry| {
                        let lex = lexical.get(&entry.chunk.id).copied().unwrap_or(0.0);
                        let sem = semantic.get(&entry.chunk.id).copied().unwrap_or(0.0);
                        let lex_norm = if lex_max > 0.0 { lex / lex_max } else { 0.0 };
                        let sem_norm = if sem_max > 0.0 { sem / sem_max } else { 0.0 };
                        let combined = HYBRID_LEXICAL_WEIGHT * lex_norm
                            + HYBRID_SEMANTIC_WEIGHT * sem_norm;
                        (combined > 0.0).then_some((combined, entry))
                    })
                    .collect()
            }
        };

        Ok(Self::paginate(scored, opts, &terms))
    }

    async fn delete(&self, chunk_ids: &[String]) -> Result<()> {
        for id in chunk_ids {
            self.chunks.remove(id);
        }
        Ok(())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<()> {
        self.chunks
            .retain(|_, e| e.chunk.document_id != document_id);
        Ok(())
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<()> {
        self.chunks.retain(|_, e| e.source_id != source_id);
        Ok(())
    }

    async fn indexed_chunks(&self) -> Result<u64> {
        Ok(self.chunks.len() as u64)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
