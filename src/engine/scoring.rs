//! BM25 relevance scoring over aggregate statistics.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegdexError};

/// Configuration for BM25.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    /// Term frequency saturation.
    pub k1: f32,

    /// Field length normalization, in `[0, 1]`.
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Bm25Config { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Config {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(SegdexError::config(format!("BM25 k1 must be >= 0, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(SegdexError::config(format!("BM25 b must be in [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

/// Collection-wide statistics of one term lookup, summed over every
/// segment taking part in a search.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TermStats {
    /// Documents across all segments.
    pub total_docs: u64,
    /// Documents containing the term.
    pub doc_freq: u64,
    /// Mean token count of the field; 0 for exact lookups.
    pub avg_field_len: f32,
}

/// Scorer for a single term lookup.
#[derive(Debug, Clone, Copy)]
pub struct Bm25 {
    config: Bm25Config,
    idf: f32,
    avg_field_len: f32,
}

impl Bm25 {
    pub fn new(config: Bm25Config, stats: TermStats) -> Self {
        Bm25 {
            config,
            idf: idf(stats.total_docs, stats.doc_freq),
            avg_field_len: stats.avg_field_len,
        }
    }

    pub fn idf(&self) -> f32 {
        self.idf
    }

    /// Score an analyzed-text match.
    pub fn score(&self, term_freq: u32, field_len: u32) -> f32 {
        let tf = term_freq as f32;
        let Bm25Config { k1, b } = self.config;
        let norm = if self.avg_field_len > 0.0 {
            1.0 - b + b * (field_len as f32 / self.avg_field_len)
        } else {
            1.0
        };
        self.idf * (tf * (k1 + 1.0)) / (tf + k1 * norm)
    }

    /// Score an exact match: a single occurrence without length normalization.
    pub fn score_exact(&self) -> f32 {
        self.idf
    }
}

/// BM25 idf, always positive.
pub fn idf(total_docs: u64, doc_freq: u64) -> f32 {
    let n = total_docs as f32;
    let df = doc_freq as f32;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
}
