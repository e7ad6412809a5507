//! Per-signal calibration: empirical (mean, stddev) baselines and the stable
//! sigmoid that maps z-scores into `(0, 1)`.
//!
//! Raw similarities live on incomparable scales: an age ratio near 0.9 is
//! routine while a clubs overlap of 0.3 is remarkable. Calibrating each raw
//! value against a baseline measured over sampled profile pairs makes the
//! signals comparable before fusion. Signals without a measured baseline fall
//! back to a fixed affine ramp centered at 0.5.
//!
//! **DETERMINISTIC**: baseline measurement uses a caller-supplied seed.

use log::{debug, info, warn};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::profile::ProfileStore;
use crate::similarity::{raw_column_similarity, raw_signal_similarity};

/// The seven fixed profile signals, in canonical order.
///
/// Text columns are not listed here; they are positional and carried
/// separately in [`SignalStats::columns`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Public,
    Gender,
    Completion,
    Age,
    Region,
    Clubs,
    Friends,
}

impl Signal {
    /// Number of fixed signals. The fused-score coverage denominator is
    /// `COUNT + n_text_columns`.
    pub const COUNT: usize = 7;

    pub const ALL: [Signal; Signal::COUNT] = [
        Signal::Public,
        Signal::Gender,
        Signal::Completion,
        Signal::Age,
        Signal::Region,
        Signal::Clubs,
        Signal::Friends,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Numerically stable logistic sigmoid: branches on sign so the exponential
/// argument is never positive.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Fallback calibration when no baseline exists: affine ramp mapping raw 0.5
/// to z=0 and the [0,1] endpoints to z=±3.
#[inline]
pub fn fallback_z(s: f64) -> f64 {
    6.0 * (s - 0.5)
}

/// Empirical (mean, stddev) baselines, one slot per fixed signal plus one per
/// configured text column. `None` (or a non-positive stddev) means "no usable
/// baseline": calibration falls back to [`fallback_z`].
#[derive(Debug, Clone, Default)]
pub struct SignalStats {
    fixed: [Option<(f64, f64)>; Signal::COUNT],
    columns: Vec<Option<(f64, f64)>>,
}

impl SignalStats {
    pub fn new(n_text_columns: usize) -> Self {
        Self { fixed: [None; Signal::COUNT], columns: vec![None; n_text_columns] }
    }

    pub fn set(&mut self, signal: Signal, mean: f64, stddev: f64) {
        self.fixed[signal.index()] = Some((mean, stddev));
    }

    pub fn set_column(&mut self, col: usize, mean: f64, stddev: f64) {
        if col >= self.columns.len() {
            self.columns.resize(col + 1, None);
        }
        self.columns[col] = Some((mean, stddev));
    }

    pub fn get(&self, signal: Signal) -> Option<(f64, f64)> {
        self.fixed[signal.index()]
    }

    pub fn get_column(&self, col: usize) -> Option<(f64, f64)> {
        self.columns.get(col).copied().flatten()
    }

    /// Z-score a raw fixed-signal similarity, falling back when the baseline
    /// is absent or degenerate.
    #[inline]
    pub fn z(&self, signal: Signal, s: f64) -> f64 {
        match self.fixed[signal.index()] {
            Some((mean, sd)) if sd > 0.0 => (s - mean) / sd,
            _ => fallback_z(s),
        }
    }

    /// Z-score a raw text-column similarity.
    #[inline]
    pub fn z_column(&self, col: usize, s: f64) -> f64 {
        match self.get_column(col) {
            Some((mean, sd)) if sd > 0.0 => (s - mean) / sd,
            _ => fallback_z(s),
        }
    }

    /// Measure baselines empirically over `pairs` sampled profile pairs.
    ///
    /// Each pair contributes to exactly the signals it defines on both sides,
    /// mirroring the skip-not-zero-fill rule of the fusion engine. Text
    /// columns are measured with the plain count cosine (no IDF), so the
    /// baseline does not depend on index construction order. Slots observed
    /// fewer than twice, or with zero variance, stay `None`.
    ///
    /// At least 1000 pairs are recommended for a stable stddev.
    pub fn measure(
        profiles: &ProfileStore,
        n_text_columns: usize,
        pairs: usize,
        seed: u64,
    ) -> Self {
        let uids: Vec<_> = profiles.keys().copied().collect();
        let mut stats = Self::new(n_text_columns);
        if uids.len() < 2 {
            warn!("Not enough profiles ({}) to measure signal baselines", uids.len());
            return stats;
        }
        info!(
            "Measuring signal baselines over {} sampled pairs ({} profiles, {} text columns)",
            pairs,
            uids.len(),
            n_text_columns
        );
        if pairs < 1000 {
            warn!("Fewer than 1000 sampled pairs; stddev estimates may be unstable");
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n_slots = Signal::COUNT + n_text_columns;
        let mut sum = vec![0.0f64; n_slots];
        let mut sumsq = vec![0.0f64; n_slots];
        let mut count = vec![0usize; n_slots];

        for _ in 0..pairs {
            let i = rng.random_range(0..uids.len());
            let j = rng.random_range(0..uids.len());
            if i == j {
                continue;
            }
            let a = &profiles[&uids[i]];
            let b = &profiles[&uids[j]];

            for signal in Signal::ALL {
                if let Some(s) = raw_signal_similarity(a, b, signal) {
                    let slot = signal.index();
                    sum[slot] += s;
                    sumsq[slot] += s * s;
                    count[slot] += 1;
                }
            }
            for t in 0..n_text_columns {
                if let Some(s) = raw_column_similarity(a, b, t, None) {
                    let slot = Signal::COUNT + t;
                    sum[slot] += s;
                    sumsq[slot] += s * s;
                    count[slot] += 1;
                }
            }
        }

        for slot in 0..n_slots {
            if count[slot] < 2 {
                continue;
            }
            let n = count[slot] as f64;
            let mean = sum[slot] / n;
            let var = (sumsq[slot] / n - mean * mean).max(0.0);
            let sd = var.sqrt();
            if sd <= 0.0 {
                debug!("Slot {} has zero variance over {} observations; leaving unset", slot, count[slot]);
                continue;
            }
            if slot < Signal::COUNT {
                stats.fixed[slot] = Some((mean, sd));
            } else {
                stats.columns[slot - Signal::COUNT] = Some((mean, sd));
            }
            debug!(
                "Baseline slot {}: mean={:.4}, stddev={:.4} over {} observations",
                slot, mean, sd, count[slot]
            );
        }

        stats
    }
}
