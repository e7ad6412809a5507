//! Offline quality measurement via seeded edge-holdout experiments.
//!
//! For each sampled focal user with degree ≥ 4, roughly a quarter of their
//! friend edges are hidden, a per-trial adjacency copy is built with those
//! edges removed, and every strategy is asked to rank candidates against the
//! weakened graph. A strategy scores a hit when any hidden friend appears in
//! its top-k; precision@k and recall@k are averaged across examined users.
//! Recovering intentionally removed real edges is the core quality signal.
//!
//! **DETERMINISTIC**: the user sample and every per-user holdout draw come
//! from one ChaCha8 stream seeded by the evaluator's `seed`; fixed seed means
//! bitwise-identical reports across runs.

use std::collections::HashSet;

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::normalizer::SignalStats;
use crate::profile::{AdjacencyGraph, ProfileStore, SparseVector, UserId};
use crate::recommender::{Backing, Ranked, Recommender, SupernodeFeatures};
use crate::similarity::SimilarityEngine;
use crate::tfidf::TfIdfIndex;

/// Minimum degree for a user to be worth holding edges out on: below this
/// there is nothing meaningful to split into train/test edges.
const MIN_HOLDOUT_DEGREE: usize = 4;

/// Aggregated metrics for one strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrategyMetrics {
    /// Fraction of examined users with ≥ 1 hidden friend in the top-k.
    pub hit_rate: f64,
    /// Mean of found/k across examined users.
    pub precision_at_k: f64,
    /// Mean of found/|hidden| across examined users.
    pub recall_at_k: f64,
}

/// Holdout report across all examined users.
#[derive(Debug, Clone, Default)]
pub struct EvalReport {
    /// Users actually examined (sampled, degree ≥ 4, non-empty holdout).
    pub examined: usize,
    pub graph: StrategyMetrics,
    pub collaborative: StrategyMetrics,
    pub interest: StrategyMetrics,
    /// Present only when supernode features were supplied.
    pub supernodes: Option<StrategyMetrics>,
}

/// Per-strategy accumulator over trials.
#[derive(Default)]
struct Tally {
    hits: usize,
    precision_sum: f64,
    recall_sum: f64,
}

impl Tally {
    fn record(&mut self, ranked: &Ranked, hidden: &HashSet<UserId>, topk: usize) {
        let found = ranked.iter().filter(|(id, _)| hidden.contains(id)).count();
        if found > 0 {
            self.hits += 1;
        }
        self.precision_sum += found as f64 / topk as f64;
        self.recall_sum += found as f64 / hidden.len() as f64;
    }

    fn finish(&self, examined: usize) -> StrategyMetrics {
        if examined == 0 {
            return StrategyMetrics::default();
        }
        let n = examined as f64;
        StrategyMetrics {
            hit_rate: self.hits as f64 / n,
            precision_at_k: self.precision_sum / n,
            recall_at_k: self.recall_sum / n,
        }
    }
}

/// Seeded holdout evaluator. Never mutates the shared snapshot; each trial
/// works on its own adjacency copy with the hidden edges removed.
#[derive(Debug, Clone)]
pub struct HoldoutEvaluator {
    sample_size: usize,
    topk: usize,
    candidate_limit: usize,
    seed: u64,
}

impl HoldoutEvaluator {
    pub fn new(sample_size: usize, topk: usize, candidate_limit: usize, seed: u64) -> Self {
        info!(
            "HoldoutEvaluator: sample_size={}, topk={}, candidate_limit={}, seed={}",
            sample_size, topk, candidate_limit, seed
        );
        Self { sample_size, topk, candidate_limit, seed }
    }

    /// Run the experiment. `stats` calibrates the similarity engine;
    /// `n_text_columns` must match the profiles' configured columns;
    /// `super_feats`, when given, additionally evaluates the supernode
    /// pre-filter (ids compared raw against hidden friend ids).
    pub fn evaluate(
        &self,
        profiles: &ProfileStore,
        adj: &AdjacencyGraph,
        stats: &SignalStats,
        n_text_columns: usize,
        super_feats: Option<&SupernodeFeatures>,
    ) -> EvalReport {
        let mut report = EvalReport::default();
        if self.topk == 0 {
            warn!("Holdout evaluation with topk=0; nothing to rank, returning empty report");
            if super_feats.is_some() {
                report.supernodes = Some(StrategyMetrics::default());
            }
            return report;
        }
        if profiles.is_empty() {
            warn!("Holdout evaluation over an empty profile store");
            return report;
        }

        let index = TfIdfIndex::build(profiles, n_text_columns);

        // Feature vectors for the supernode strategy, built once: merged
        // TF-IDF vectors per user, empty vectors skipped.
        let user_feats: Option<std::collections::BTreeMap<UserId, SparseVector>> =
            super_feats.map(|_| {
                profiles
                    .iter()
                    .filter_map(|(&uid, p)| {
                        let v = index.tfidf_vector(p);
                        (!v.is_empty()).then_some((uid, v))
                    })
                    .collect()
            });

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut ids: Vec<UserId> = profiles.keys().copied().collect();
        ids.shuffle(&mut rng);

        let test_users: Vec<UserId> = ids
            .into_iter()
            .filter(|uid| adj.get(uid).is_some_and(|f| f.len() >= MIN_HOLDOUT_DEGREE))
            .take(self.sample_size)
            .collect();
        if test_users.is_empty() {
            warn!("No users with degree >= {} to evaluate", MIN_HOLDOUT_DEGREE);
            return report;
        }
        info!("Evaluating {} sampled users", test_users.len());

        let mut graph_tally = Tally::default();
        let mut collab_tally = Tally::default();
        let mut interest_tally = Tally::default();
        let mut super_tally = Tally::default();
        let mut examined = 0usize;

        for uid in test_users {
            let friends = &adj[&uid];
            let hold_k = (friends.len() / 4).max(1);

            let mut order: Vec<usize> = (0..friends.len()).collect();
            order.shuffle(&mut rng);
            let hidden: HashSet<UserId> =
                order[..hold_k].iter().map(|&i| friends[i]).collect();
            if hidden.is_empty() {
                debug!("User {}: empty holdout, skipping", uid);
                continue;
            }

            // Per-trial adjacency: shared snapshot stays untouched.
            let mut trial_adj = adj.clone();
            trial_adj.insert(
                uid,
                friends.iter().copied().filter(|f| !hidden.contains(f)).collect(),
            );

            let engine = SimilarityEngine::new(n_text_columns)
                .with_stats(stats.clone())
                .with_index(&index);
            let rec = Recommender::new(Backing::Profiles(profiles), &trial_adj, engine);

            graph_tally.record(
                &rec.graph_registration(uid, self.topk, self.candidate_limit),
                &hidden,
                self.topk,
            );
            collab_tally.record(
                &rec.collaborative(uid, self.topk, self.candidate_limit),
                &hidden,
                self.topk,
            );
            interest_tally.record(
                &rec.by_interest(uid, self.topk, self.candidate_limit),
                &hidden,
                self.topk,
            );

            if let (Some(sf), Some(feats)) = (super_feats, user_feats.as_ref()) {
                let engine = SimilarityEngine::new(n_text_columns)
                    .with_stats(stats.clone())
                    .with_index(&index);
                let rec_s = Recommender::new(Backing::Features(feats), &trial_adj, engine);
                super_tally.record(&rec_s.from_supernodes(uid, sf, self.topk), &hidden, self.topk);
            }

            examined += 1;
        }

        report.examined = examined;
        report.graph = graph_tally.finish(examined);
        report.collaborative = collab_tally.finish(examined);
        report.interest = interest_tally.finish(examined);
        if super_feats.is_some() {
            report.supernodes = Some(super_tally.finish(examined));
        }
        debug!(
            "Holdout report: examined={}, graph hit={:.3}, collab hit={:.3}, interest hit={:.3}",
            report.examined, report.graph.hit_rate, report.collaborative.hit_rate, report.interest.hit_rate
        );
        report
    }
}
