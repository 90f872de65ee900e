//! Relevance ranking over a fitted [`IndexSnapshot`].
//!
//! # Algorithm
//!
//! 1. Project the query through the snapshot's vocabulary.
//! 2. Cosine similarity against every document vector.
//! 3. Drop non-positive scores: no term overlap means not relevant.
//! 4. Stable sort by score (desc), so ties keep corpus order.
//! 5. Truncate to `top_k` and attach a bounded excerpt.

use crate::index::{CorpusIndex, IndexSnapshot};
use crate::models::RankedResult;

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_EXCERPT_CHARS: usize = 1000;

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Maximum results to return.
    pub top_k: usize,
    /// Character cap on each result's excerpt.
    pub excerpt_chars: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

/// Rank the snapshot's documents against `query`.
pub fn search(snapshot: &IndexSnapshot, query: &str, params: &SearchParams) -> Vec<RankedResult> {
    if query.trim().is_empty() || params.top_k == 0 {
        return Vec::new();
    }

    let projected = snapshot.project(query);
    if projected.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f64)> = (0..snapshot.len())
        .map(|position| (position, snapshot.similarity(&projected, position)))
        .filter(|(_, score)| *score > 0.0)
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(params.top_k);

    let documents = snapshot.documents();
    scored
        .into_iter()
        .map(|(position, score)| {
            let doc = &documents[position];
            RankedResult {
                position,
                document_id: doc.id.clone(),
                source: doc.source.clone(),
                label: doc.label(),
                score,
                excerpt: excerpt(&doc.text, params.excerpt_chars),
            }
        })
        .collect()
}

impl CorpusIndex {
    /// Rank against the current snapshot; empty when no index is built.
    pub fn search(&self, query: &str, params: &SearchParams) -> Vec<RankedResult> {
        match self.snapshot() {
            Some(snapshot) => search(&snapshot, query, params),
            None => Vec::new(),
        }
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_end, _)) => format!("{}...", &text[..byte_end]),
        None => text.to_string(),
    }
}
