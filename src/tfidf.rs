//! TF-IDF index over pre-tokenized text columns.
//!
//! One pass over the profile store counts, per (column, token), the number of
//! distinct users carrying that token at least once. The smooth IDF variant
//! `ln(1 + N / (1 + df))` keeps weights finite for unseen tokens (df = 0) and
//! strictly positive for ubiquitous ones.

use std::collections::HashMap;

use log::{debug, info};

use crate::profile::{token_key, ProfileStore, SparseVector, UserProfile};

/// Document-frequency tables and derived IDF weights, one table per
/// configured text column. Built once from an immutable profile snapshot.
#[derive(Debug, Clone, Default)]
pub struct TfIdfIndex {
    /// Total number of profiles the index was built over.
    n: usize,
    /// Per column: token_id -> number of distinct users containing it.
    doc_freqs: Vec<HashMap<u32, u32>>,
}

impl TfIdfIndex {
    /// Build the index in a single pass over `profiles`.
    pub fn build(profiles: &ProfileStore, n_text_columns: usize) -> Self {
        info!(
            "Building TF-IDF index: {} profiles, {} text columns",
            profiles.len(),
            n_text_columns
        );
        let mut doc_freqs = vec![HashMap::new(); n_text_columns];
        for profile in profiles.values() {
            for (t, tokens) in profile.token_cols.iter().enumerate().take(n_text_columns) {
                let df = &mut doc_freqs[t];
                for &token in tokens.keys() {
                    *df.entry(token).or_insert(0u32) += 1;
                }
            }
        }
        for (t, df) in doc_freqs.iter().enumerate() {
            debug!("Column {}: {} distinct tokens", t, df.len());
        }
        Self { n: profiles.len(), doc_freqs }
    }

    pub fn n_columns(&self) -> usize {
        self.doc_freqs.len()
    }

    /// Smooth IDF for `token` in column `col`; tokens the index never saw get
    /// df = 0, the maximum weight.
    #[inline]
    pub fn idf(&self, col: usize, token: u32) -> f64 {
        let df = self.doc_freqs[col].get(&token).copied().unwrap_or(0);
        (1.0 + self.n as f64 / (1.0 + df as f64)).ln()
    }

    /// Cosine similarity of two token-count maps with each count weighted by
    /// its IDF. Returns 0 for empty inputs, zero norms, or a column index the
    /// index does not cover.
    pub fn weighted_cosine(
        &self,
        a: &HashMap<u32, u32>,
        b: &HashMap<u32, u32>,
        col: usize,
    ) -> f64 {
        if a.is_empty() || b.is_empty() || col >= self.doc_freqs.len() {
            return 0.0;
        }
        let mut norm_a = 0.0;
        for (&token, &count) in a {
            let w = count as f64 * self.idf(col, token);
            norm_a += w * w;
        }
        let mut norm_b = 0.0;
        for (&token, &count) in b {
            let w = count as f64 * self.idf(col, token);
            norm_b += w * w;
        }
        if norm_a <= 0.0 || norm_b <= 0.0 {
            return 0.0;
        }
        // Iterate the smaller map; intersection is bounded by it.
        let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        let mut dot = 0.0;
        for (&token, &count_s) in small {
            if let Some(&count_l) = large.get(&token) {
                let idf = self.idf(col, token);
                dot += (count_s as f64 * idf) * (count_l as f64 * idf);
            }
        }
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }

    /// Merge `tf * idf` weights across all columns into one sparse vector
    /// keyed by the column-namespaced [`crate::profile::TokenKey`], so equal
    /// token ids from different columns never collide.
    pub fn tfidf_vector(&self, profile: &UserProfile) -> SparseVector {
        let mut out = SparseVector::new();
        if self.n == 0 {
            return out;
        }
        for (t, tokens) in profile
            .token_cols
            .iter()
            .enumerate()
            .take(self.doc_freqs.len())
        {
            for (&token, &count) in tokens {
                let w = count as f64 * self.idf(t, token);
                *out.entry(token_key(t, token)).or_insert(0.0) += w;
            }
        }
        out
    }
}
