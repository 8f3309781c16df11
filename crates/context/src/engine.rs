//! Compression engine — ranks retrieved chunks and fits them into a token
//! budget.
//!
//! The pipeline is: normalize whitespace → drop empty chunks → stable sort
//! by score (recency breaks ties) → truncate each candidate to a word cap →
//! greedily accept candidates that fit the remaining budget → render one
//! block line per accepted chunk.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::token::estimate_tokens;

/// Header line of every non-empty prompt block.
const BLOCK_HEADER: &str = "Relevant context:";

/// Appended to a chunk's text when the word cap truncated it.
const CONTINUATION_MARKER: &str = "...";

/// Source label used when a chunk arrives without one.
const DEFAULT_SOURCE: &str = "memory";

/// A retrieved context unit from the memory/search layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub project_id: String,
    pub source: String,
    pub text: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Controls compression behavior. Zero/unset fields fall back to defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub max_tokens: usize,
    pub max_chunks: usize,
    pub max_words_per_chunk: usize,
}

const DEFAULT_MAX_TOKENS: usize = 700;
const DEFAULT_MAX_CHUNKS: usize = 8;
const DEFAULT_MAX_WORDS_PER_CHUNK: usize = 60;

/// A compressed prompt block plus metadata for telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionResult {
    /// The assembled block, empty when nothing survived normalization.
    pub prompt_block: String,

    /// Accepted chunks in acceptance order, with truncated text.
    pub selected: Vec<Chunk>,

    /// Chunks that survived normalization but were not accepted.
    pub dropped: usize,

    /// Total estimated token cost of the selected chunks.
    pub estimated_tokens: usize,
}

impl CompressionResult {
    fn empty() -> Self {
        Self {
            prompt_block: String::new(),
            selected: Vec::new(),
            dropped: 0,
            estimated_tokens: 0,
        }
    }
}

/// Deterministic context compression for prompt injection.
pub struct Engine {
    opts: Options,
}

impl Engine {
    /// Build an engine; zero option fields take their defaults.
    pub fn new(opts: Options) -> Self {
        let mut cfg = Options {
            max_tokens: DEFAULT_MAX_TOKENS,
            max_chunks: DEFAULT_MAX_CHUNKS,
            max_words_per_chunk: DEFAULT_MAX_WORDS_PER_CHUNK,
        };
        if opts.max_tokens > 0 {
            cfg.max_tokens = opts.max_tokens;
        }
        if opts.max_chunks > 0 {
            cfg.max_chunks = opts.max_chunks;
        }
        if opts.max_words_per_chunk > 0 {
            cfg.max_words_per_chunk = opts.max_words_per_chunk;
        }
        Self { opts: cfg }
    }

    /// Rank chunks, trim each one, and fit the selection into the token
    /// budget. Never exceeds `max_tokens` or `max_chunks`; empty input is
    /// not an error.
    pub fn compress(&self, chunks: &[Chunk]) -> CompressionResult {
        if chunks.is_empty() {
            return CompressionResult::empty();
        }

        let mut ranked: Vec<Chunk> = chunks
            .iter()
            .filter_map(|c| {
                let text = normalize_whitespace(&c.text);
                if text.is_empty() {
                    return None;
                }
                let mut chunk = c.clone();
                chunk.text = text;
                Some(chunk)
            })
            .collect();
        if ranked.is_empty() {
            return CompressionResult::empty();
        }

        // Higher score first, then newer first. Stable: full ties keep
        // their input order.
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });

        let mut selected: Vec<Chunk> = Vec::with_capacity(ranked.len().min(self.opts.max_chunks));
        let mut used = 0usize;

        for mut chunk in ranked.iter().cloned() {
            if selected.len() >= self.opts.max_chunks {
                break;
            }

            let trimmed = truncate_words(&chunk.text, self.opts.max_words_per_chunk);
            let cost = estimate_tokens(&trimmed);
            if cost == 0 {
                continue;
            }
            if used + cost > self.opts.max_tokens {
                continue;
            }

            chunk.text = trimmed;
            selected.push(chunk);
            used += cost;
        }

        let mut lines = Vec::with_capacity(selected.len() + 1);
        lines.push(BLOCK_HEADER.to_string());
        for (i, chunk) in selected.iter().enumerate() {
            let source = if chunk.source.is_empty() {
                DEFAULT_SOURCE
            } else {
                &chunk.source
            };
            lines.push(format!("- [{}] {}: {}", i + 1, source, chunk.text));
        }

        let dropped = ranked.len() - selected.len();
        trace!(
            selected = selected.len(),
            dropped,
            estimated_tokens = used,
            "context compressed"
        );

        CompressionResult {
            prompt_block: lines.join("\n"),
            selected,
            dropped,
            estimated_tokens: used,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

/// Collapse all whitespace runs to single spaces and trim the ends.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap `text` at `max_words` words, marking truncation.
fn truncate_words(text: &str, max_words: usize) -> String {
    if max_words == 0 {
        return String::new();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    let mut out = words[..max_words].join(" ");
    out.push(' ');
    out.push_str(CONTINUATION_MARKER);
    out
}
