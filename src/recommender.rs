//! Ranking strategies over the candidate frontier.
//!
//! A [`Recommender`] is constructed over exactly one of two backing stores,
//! raw profiles or precomputed sparse feature vectors, plus the adjacency
//! graph. The pair-similarity primitive is the calibrated fusion score in
//! profile mode and sparse cosine in feature mode; each strategy branches on
//! the backing once per call, not per comparison.
//!
//! Every strategy returns `(id, score)` pairs sorted score-descending with
//! ascending-id tie-break, truncated to `topk`. Scores are finite by
//! construction. Per-candidate scoring runs on rayon; the final sequential
//! sort restores deterministic output.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::candidates::gather_candidates;
use crate::profile::{AdjacencyGraph, ProfileStore, SparseVector, UserId};
use crate::similarity::{sparse_cosine, sparse_dot, SimilarityEngine};

/// Ranked output: `(id, score)`, score-desc then id-asc, length ≤ topk.
pub type Ranked = Vec<(u32, f64)>;

/// Supernode id -> aggregated, L2-normalized feature vector.
pub type SupernodeFeatures = BTreeMap<u32, SparseVector>;

/// The two mutually exclusive backing stores.
#[derive(Clone, Copy)]
pub enum Backing<'a> {
    /// Score pairs with the calibrated fusion engine over raw profiles.
    Profiles(&'a ProfileStore),
    /// Score pairs with sparse cosine over precomputed feature vectors.
    Features(&'a BTreeMap<UserId, SparseVector>),
}

impl<'a> Backing<'a> {
    fn contains(&self, user: UserId) -> bool {
        match self {
            Backing::Profiles(p) => p.contains_key(&user),
            Backing::Features(f) => f.contains_key(&user),
        }
    }

    fn len(&self) -> usize {
        match self {
            Backing::Profiles(p) => p.len(),
            Backing::Features(f) => f.len(),
        }
    }
}

pub struct Recommender<'a> {
    backing: Backing<'a>,
    adj: &'a AdjacencyGraph,
    engine: SimilarityEngine<'a>,
}

impl<'a> Recommender<'a> {
    pub fn new(backing: Backing<'a>, adj: &'a AdjacencyGraph, engine: SimilarityEngine<'a>) -> Self {
        info!(
            "Recommender over {} backing: {} entries, {} adjacency rows",
            match backing {
                Backing::Profiles(_) => "profile",
                Backing::Features(_) => "feature-vector",
            },
            backing.len(),
            adj.len()
        );
        Self { backing, adj, engine }
    }

    pub fn engine(&self) -> &SimilarityEngine<'a> {
        &self.engine
    }

    /// Pair similarity under the active backing; `None` when either id is
    /// absent from the store.
    fn pair_similarity(&self, a: UserId, b: UserId) -> Option<f64> {
        match self.backing {
            Backing::Profiles(profiles) => {
                Some(self.engine.score(profiles.get(&a)?, profiles.get(&b)?))
            }
            Backing::Features(feats) => Some(sparse_cosine(feats.get(&a)?, feats.get(&b)?)),
        }
    }

    fn friend_set(&self, user: UserId) -> HashSet<UserId> {
        let mut existing: HashSet<UserId> = self
            .adj
            .get(&user)
            .map(|f| f.iter().copied().collect())
            .unwrap_or_default();
        existing.insert(user);
        existing
    }

    /// Rank 2-hop frontier candidates by direct similarity to the focal user,
    /// excluding existing friends and the user itself.
    pub fn graph_registration(&self, user: UserId, topk: usize, limit: usize) -> Ranked {
        if !self.backing.contains(user) {
            debug!("graph_registration: unknown focal user {}", user);
            return Vec::new();
        }
        let candidates = gather_candidates(self.adj, user, limit);
        let existing = self.friend_set(user);

        let scored: Ranked = candidates
            .par_iter()
            .filter(|c| !existing.contains(*c))
            .filter_map(|&c| self.pair_similarity(user, c).map(|s| (c, s)))
            .collect();
        sort_truncate(scored, topk)
    }

    /// Weighted path propagation: each direct friend `f` votes for its own
    /// friends with weight `sim(user, f)`, so
    /// `score(c) = Σ_f sim(user, f) · sim(f, c)` over friends-of-friends.
    /// Existing direct friends and the focal user are excluded from the
    /// candidate set.
    pub fn collaborative(&self, user: UserId, topk: usize, limit: usize) -> Ranked {
        if !self.backing.contains(user) {
            debug!("collaborative: unknown focal user {}", user);
            return Vec::new();
        }
        let friends: &[UserId] = self.adj.get(&user).map(Vec::as_slice).unwrap_or(&[]);
        let friend_lookup: HashSet<UserId> = friends.iter().copied().collect();

        // Bounded friends-of-friends candidate set.
        let mut candidates: Vec<UserId> = Vec::new();
        let mut seen: HashSet<UserId> = HashSet::new();
        'outer: for &f in friends {
            let Some(fof) = self.adj.get(&f) else { continue };
            for &c in fof {
                if c == user || friend_lookup.contains(&c) {
                    continue;
                }
                if seen.insert(c) {
                    candidates.push(c);
                    if candidates.len() >= limit {
                        break 'outer;
                    }
                }
            }
        }

        // Friend weights are reused across every candidate; compute once.
        let weights: Vec<(UserId, f64)> = friends
            .iter()
            .filter_map(|&f| self.pair_similarity(user, f).map(|w| (f, w)))
            .collect();

        let scored: Ranked = candidates
            .par_iter()
            .filter(|c| self.backing.contains(**c))
            .map(|&c| {
                let score: f64 = weights
                    .iter()
                    .filter_map(|&(f, w)| self.pair_similarity(f, c).map(|s| w * s))
                    .sum();
                (c, score)
            })
            .collect();
        sort_truncate(scored, topk)
    }

    /// Interest-driven ranking. Currently identical to
    /// [`graph_registration`]: the text-column signals already flow through
    /// the fused score, and a text-only variant has not been carved out.
    pub fn by_interest(&self, user: UserId, topk: usize, limit: usize) -> Ranked {
        self.graph_registration(user, topk, limit)
    }

    /// Rank club ids the focal user does not belong to. Direct friends with
    /// positive similarity vote their clubs with weight `sim(user, f)`;
    /// second-hop friends vote with `sim(user, f) · sim(f, fof)`. `limit`
    /// bounds the number of second-hop evaluations. Profile backing only;
    /// feature vectors carry no club memberships.
    pub fn clubs_collaborative(&self, user: UserId, topk: usize, limit: usize) -> Ranked {
        let Backing::Profiles(profiles) = self.backing else {
            warn!("clubs_collaborative requires a profile backing; returning empty");
            return Vec::new();
        };
        let Some(query) = profiles.get(&user) else {
            debug!("clubs_collaborative: unknown focal user {}", user);
            return Vec::new();
        };
        let friends: &[UserId] = self.adj.get(&user).map(Vec::as_slice).unwrap_or(&[]);
        let user_clubs: HashSet<u32> = query.clubs.iter().copied().collect();

        let mut weights: HashMap<UserId, f64> = HashMap::with_capacity(friends.len());
        for &f in friends {
            if let Some(fp) = profiles.get(&f) {
                weights.insert(f, self.engine.score(query, fp));
            }
        }

        let mut club_scores: HashMap<u32, f64> = HashMap::new();
        for &f in friends {
            let Some(&w) = weights.get(&f) else { continue };
            if w <= 0.0 {
                continue;
            }
            let fp = &profiles[&f];
            for &club in &fp.clubs {
                if !user_clubs.contains(&club) {
                    *club_scores.entry(club).or_insert(0.0) += w;
                }
            }
        }

        let mut second_hop = 0usize;
        'outer: for &f in friends {
            let Some(&w) = weights.get(&f) else { continue };
            if w <= 0.0 {
                continue;
            }
            let fp = &profiles[&f];
            let Some(fof_list) = self.adj.get(&f) else { continue };
            for &fof in fof_list {
                if fof == user {
                    continue;
                }
                let Some(fofp) = profiles.get(&fof) else { continue };
                if second_hop >= limit {
                    break 'outer;
                }
                second_hop += 1;
                let s = self.engine.score(fp, fofp);
                if s <= 0.0 {
                    continue;
                }
                let contrib = w * s;
                for &club in &fofp.clubs {
                    if !user_clubs.contains(&club) {
                        *club_scores.entry(club).or_insert(0.0) += contrib;
                    }
                }
            }
        }

        let scored: Ranked = club_scores.into_iter().collect();
        sort_truncate(scored, topk)
    }

    /// Coarse pre-filter: raw dot product (no renormalization) of the focal
    /// user's feature vector against every supernode aggregate. In profile
    /// mode the feature vector is the merged TF-IDF vector, computed on the
    /// fly from the attached index; without an index every dot is 0.
    pub fn from_supernodes(
        &self,
        user: UserId,
        super_feats: &SupernodeFeatures,
        topk: usize,
    ) -> Ranked {
        let query: SparseVector = match self.backing {
            Backing::Features(feats) => match feats.get(&user) {
                Some(v) => v.clone(),
                None => {
                    debug!("from_supernodes: unknown focal user {}", user);
                    return Vec::new();
                }
            },
            Backing::Profiles(profiles) => {
                let Some(p) = profiles.get(&user) else {
                    debug!("from_supernodes: unknown focal user {}", user);
                    return Vec::new();
                };
                match self.engine.index() {
                    Some(index) => index.tfidf_vector(p),
                    None => {
                        warn!("from_supernodes without a TF-IDF index; all dots are 0");
                        SparseVector::new()
                    }
                }
            }
        };

        let scored: Ranked = super_feats
            .iter()
            .map(|(&sid, vec)| (sid, sparse_dot(&query, vec)))
            .collect();
        sort_truncate(scored, topk)
    }
}

/// Deterministic ranking order: score descending, id ascending on ties.
/// Scores are finite, so `total_cmp` agrees with the numeric order.
fn sort_truncate(mut out: Ranked, topk: usize) -> Ranked {
    out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out.truncate(topk);
    out
}
