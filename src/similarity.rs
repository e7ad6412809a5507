//! The fusion engine: per-signal raw similarities, z-score calibration, and
//! harmonic-mean fusion into one score in `[0, 1]`.
//!
//! A signal contributes only when **both** profiles define it; missing data is
//! skipped, never zero-filled. Each contributing raw similarity is z-scored
//! against its empirical baseline (see [`crate::normalizer`]), squashed
//! through the stable sigmoid, and averaged into a strength term `S`. The
//! coverage term `F` is the fraction of possible signals that contributed.
//! The final score is the harmonic mean `2·S·F / (S + F)`: a single strong
//! match cannot outrank many weaker but broadly corroborating ones.

use std::collections::HashMap;

use log::trace;

use crate::normalizer::{sigmoid, Signal, SignalStats};
use crate::profile::{SparseVector, UserProfile};
use crate::tfidf::TfIdfIndex;

/// Overlap of two id lists normalized by the geometric mean of their sizes:
/// `|A∩B| / sqrt(|A|·|B|)`. Empty inputs score 0.
pub fn set_similarity(a: &[u32], b: &[u32]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lookup: std::collections::HashSet<u32> = a.iter().copied().collect();
    let inter = b.iter().filter(|v| lookup.contains(v)).count();
    inter as f64 / ((a.len() as f64).sqrt() * (b.len() as f64).sqrt())
}

/// Region-triple similarity: matching non-missing parts over the geometric
/// mean of each side's non-missing count. 0 when either side is fully absent.
pub fn region_similarity(a: &[i32; 3], b: &[i32; 3]) -> f64 {
    let mut a_cnt = 0usize;
    let mut b_cnt = 0usize;
    let mut matches = 0usize;
    for i in 0..3 {
        if a[i] >= 0 {
            a_cnt += 1;
        }
        if b[i] >= 0 {
            b_cnt += 1;
        }
        if a[i] >= 0 && b[i] >= 0 && a[i] == b[i] {
            matches += 1;
        }
    }
    if a_cnt == 0 || b_cnt == 0 {
        return 0.0;
    }
    matches as f64 / ((a_cnt as f64).sqrt() * (b_cnt as f64).sqrt())
}

/// Plain cosine of two token-count maps, no IDF weighting.
pub fn cosine_counts(a: &HashMap<u32, u32>, b: &HashMap<u32, u32>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let norm_a: f64 = a.values().map(|&c| (c as f64) * (c as f64)).sum();
    let norm_b: f64 = b.values().map(|&c| (c as f64) * (c as f64)).sum();
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut dot = 0.0;
    for (token, &count_s) in small {
        if let Some(&count_l) = large.get(token) {
            dot += count_s as f64 * count_l as f64;
        }
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Raw dot product of two sparse feature vectors, iterating the smaller side.
pub fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut dot = 0.0;
    for (key, &va) in small {
        if let Some(&vb) = large.get(key) {
            dot += va * vb;
        }
    }
    dot
}

/// Cosine of two sparse feature vectors; 0 for empty inputs or zero norms.
pub fn sparse_cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let norm_a: f64 = a.values().map(|v| v * v).sum();
    let norm_b: f64 = b.values().map(|v| v * v).sum();
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    sparse_dot(a, b) / (norm_a.sqrt() * norm_b.sqrt())
}

/// Raw similarity for one fixed signal, `None` when either side leaves the
/// signal undefined.
pub fn raw_signal_similarity(a: &UserProfile, b: &UserProfile, signal: Signal) -> Option<f64> {
    match signal {
        Signal::Public => {
            if a.public_flag >= 0 && b.public_flag >= 0 {
                Some(if a.public_flag == b.public_flag { 1.0 } else { 0.0 })
            } else {
                None
            }
        }
        Signal::Gender => {
            if a.gender >= 0 && b.gender >= 0 {
                Some(if a.gender == b.gender { 1.0 } else { 0.0 })
            } else {
                None
            }
        }
        Signal::Completion => {
            if a.completion_percentage > 0 && b.completion_percentage > 0 {
                let lo = a.completion_percentage.min(b.completion_percentage) as f64;
                let hi = a.completion_percentage.max(b.completion_percentage) as f64;
                Some(lo / hi)
            } else {
                None
            }
        }
        Signal::Age => {
            if a.age > 0 && b.age > 0 {
                let lo = a.age.min(b.age) as f64;
                let hi = a.age.max(b.age) as f64;
                Some(lo / hi)
            } else {
                None
            }
        }
        Signal::Region => {
            if a.region_parts_set() > 0 && b.region_parts_set() > 0 {
                Some(region_similarity(&a.region, &b.region))
            } else {
                None
            }
        }
        Signal::Clubs => {
            if !a.clubs.is_empty() && !b.clubs.is_empty() {
                Some(set_similarity(&a.clubs, &b.clubs))
            } else {
                None
            }
        }
        Signal::Friends => {
            if !a.friends.is_empty() && !b.friends.is_empty() {
                Some(set_similarity(&a.friends, &b.friends))
            } else {
                None
            }
        }
    }
}

/// Raw similarity for text column `col`: IDF-weighted cosine when an index is
/// supplied, plain count cosine otherwise. `None` when either side is empty
/// for that column.
pub fn raw_column_similarity(
    a: &UserProfile,
    b: &UserProfile,
    col: usize,
    index: Option<&TfIdfIndex>,
) -> Option<f64> {
    let ta = a.token_cols.get(col).filter(|m| !m.is_empty())?;
    let tb = b.token_cols.get(col).filter(|m| !m.is_empty())?;
    Some(match index {
        Some(idx) => idx.weighted_cosine(ta, tb, col),
        None => cosine_counts(ta, tb),
    })
}

/// Calibrated multi-signal profile similarity.
///
/// Holds the baselines, the configured text-column count, and an optional
/// borrowed TF-IDF index. Construction is cheap; one engine is typically
/// shared across an entire ranking pass.
#[derive(Debug, Clone)]
pub struct SimilarityEngine<'a> {
    stats: SignalStats,
    n_text_columns: usize,
    index: Option<&'a TfIdfIndex>,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(n_text_columns: usize) -> Self {
        Self { stats: SignalStats::new(n_text_columns), n_text_columns, index: None }
    }

    pub fn with_stats(mut self, stats: SignalStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_index(mut self, index: &'a TfIdfIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn n_text_columns(&self) -> usize {
        self.n_text_columns
    }

    pub fn index(&self) -> Option<&'a TfIdfIndex> {
        self.index
    }

    /// Fused, calibrated similarity in `[0, 1]`. Symmetric in its arguments.
    /// Zero contributing signals produce 0. Note `score(a, a)` is not pinned
    /// to 1.0: it is the sigmoid of the self-match z-scores, which depends on
    /// the measured baselines.
    pub fn score(&self, a: &UserProfile, b: &UserProfile) -> f64 {
        let total_possible = Signal::COUNT + self.n_text_columns;
        let mut used = 0usize;
        let mut sum = 0.0f64;

        for signal in Signal::ALL {
            if let Some(s) = raw_signal_similarity(a, b, signal) {
                sum += sigmoid(self.stats.z(signal, s));
                used += 1;
            }
        }
        for col in 0..self.n_text_columns {
            if let Some(s) = raw_column_similarity(a, b, col, self.index) {
                sum += sigmoid(self.stats.z_column(col, s));
                used += 1;
            }
        }

        if used == 0 {
            return 0.0;
        }
        let strength = sum / used as f64;
        let coverage = used as f64 / total_possible as f64;
        if strength <= 0.0 && coverage <= 0.0 {
            return 0.0;
        }
        let fused = 2.0 * strength * coverage / (strength + coverage);
        trace!(
            "score({}, {}): used={}/{}, S={:.4}, F={:.4}, fused={:.4}",
            a.user_id,
            b.user_id,
            used,
            total_possible,
            strength,
            coverage,
            fused
        );
        fused
    }
}
