//! Hierarchical graph coarsening: greedy multilevel agglomeration of users
//! into supernodes with aggregated feature vectors.
//!
//! One level visits nodes in ascending id order and greedily pairs each
//! unvisited node with its best unvisited neighbor (the one maximizing
//! feature dot product discounted by a size penalty), or leaves it as a
//! singleton. Each node is consumed exactly once per level; there is no
//! backtracking, which keeps a level at O(V + E) at the cost of optimal
//! matching quality. Repeating the level step contracts the graph
//! geometrically while member lists keep tracking original node ids, so the
//! total membership at any level equals the original node count.

use std::collections::BTreeMap;

use log::{debug, info, trace};

use crate::profile::{SparseVector, UserId};
use crate::similarity::sparse_dot;

/// Adjacency over the current level's node ids (original uids at level 0,
/// supernode ids afterwards).
pub type LevelAdjacency = BTreeMap<u32, Vec<u32>>;

/// Node id -> feature vector at the current level.
pub type LevelFeatures = BTreeMap<u32, SparseVector>;

/// Greedy multilevel coarsener. `max_supernode_size <= 0` disables the size
/// cap and the merge penalty.
#[derive(Debug, Clone)]
pub struct HierCoarsener {
    max_supernode_size: i32,
    size_penalty: f64,
    /// Original-level node id -> supernode id at the last computed level.
    pub node_to_super: BTreeMap<u32, u32>,
    /// Supernode id -> aggregated, L2-normalized feature vector.
    pub super_features: LevelFeatures,
    /// Supernode id -> original member node ids.
    pub super_members: BTreeMap<u32, Vec<UserId>>,
}

impl HierCoarsener {
    pub fn new(max_supernode_size: i32, size_penalty: f64) -> Self {
        info!(
            "HierCoarsener: max_supernode_size={} ({}), size_penalty={}",
            max_supernode_size,
            if max_supernode_size > 0 { "capped" } else { "unconstrained" },
            size_penalty
        );
        Self {
            max_supernode_size,
            size_penalty,
            node_to_super: BTreeMap::new(),
            super_features: LevelFeatures::new(),
            super_members: BTreeMap::new(),
        }
    }

    /// Merge score for pairing nodes of sizes `size_u` and `size_v` with
    /// feature dot `dot`: the dot discounted by
    /// `size_penalty · clamp((size_u+size_v-1)/max, 0, 1)`; no discount when
    /// the cap is disabled.
    fn merge_score(&self, dot: f64, size_u: usize, size_v: usize) -> f64 {
        if self.max_supernode_size <= 0 {
            return dot;
        }
        let frac = ((size_u + size_v - 1) as f64 / self.max_supernode_size as f64).clamp(0.0, 1.0);
        dot * (1.0 - self.size_penalty * frac)
    }

    /// One coarsening pass. `members` carries, per current node, the original
    /// node ids it already represents (singletons at level 0). Fills
    /// `node_to_super`, `super_features`, `super_members` for this level.
    fn coarsen_level(
        &mut self,
        feats: &LevelFeatures,
        adj: &LevelAdjacency,
        members: &BTreeMap<u32, Vec<UserId>>,
    ) {
        self.node_to_super.clear();
        self.super_features.clear();
        self.super_members.clear();

        let mut visited: std::collections::HashSet<u32> = std::collections::HashSet::new();
        let mut next_super: u32 = 0;

        let size_of = |node: u32| members.get(&node).map_or(1, Vec::len);

        for (&u, feat_u) in feats {
            if !visited.insert(u) {
                continue;
            }
            let size_u = size_of(u);

            let mut best_v: Option<u32> = None;
            let mut best_score = 0.0f64;

            if let Some(neighbors) = adj.get(&u) {
                for &v in neighbors {
                    if visited.contains(&v) {
                        continue;
                    }
                    let Some(feat_v) = feats.get(&v) else { continue };
                    let size_v = size_of(v);
                    if self.max_supernode_size > 0
                        && size_u + size_v > self.max_supernode_size as usize
                    {
                        continue;
                    }
                    let score = self.merge_score(sparse_dot(feat_u, feat_v), size_u, size_v);
                    if score > best_score {
                        best_score = score;
                        best_v = Some(v);
                    }
                }
            }

            match best_v {
                Some(v) if best_score > 0.0 => {
                    visited.insert(v);
                    let size_v = size_of(v);
                    let total = size_u + size_v;
                    trace!(
                        "Level merge: {} (size {}) + {} (size {}) -> supernode {} (score {:.4})",
                        u,
                        size_u,
                        v,
                        size_v,
                        next_super,
                        best_score
                    );

                    // Size-weighted average, then L2 renormalization.
                    let mut merged = SparseVector::new();
                    for (&k, &x) in feat_u {
                        *merged.entry(k).or_insert(0.0) += x * size_u as f64;
                    }
                    for (&k, &x) in &feats[&v] {
                        *merged.entry(k).or_insert(0.0) += x * size_v as f64;
                    }
                    for x in merged.values_mut() {
                        *x /= total as f64;
                    }
                    let norm: f64 = merged.values().map(|x| x * x).sum::<f64>().sqrt();
                    if norm > 0.0 {
                        for x in merged.values_mut() {
                            *x /= norm;
                        }
                    }

                    let mut member_ids = members.get(&u).cloned().unwrap_or_else(|| vec![u]);
                    member_ids.extend(members.get(&v).cloned().unwrap_or_else(|| vec![v]));

                    self.node_to_super.insert(u, next_super);
                    self.node_to_super.insert(v, next_super);
                    self.super_features.insert(next_super, merged);
                    self.super_members.insert(next_super, member_ids);
                    next_super += 1;
                }
                _ => {
                    self.node_to_super.insert(u, next_super);
                    self.super_features.insert(next_super, feat_u.clone());
                    self.super_members
                        .insert(next_super, members.get(&u).cloned().unwrap_or_else(|| vec![u]));
                    next_super += 1;
                }
            }
        }

        debug!(
            "Coarsen level: {} nodes -> {} supernodes",
            feats.len(),
            self.super_features.len()
        );
    }

    /// Run `levels` coarsening passes, recontracting adjacency after each one
    /// (self-loops from same-supernode merges dropped, cross-supernode edges
    /// deduplicated, neighbors without a supernode assignment skipped).
    ///
    /// After the call, `super_features`/`super_members` describe the final
    /// level and `node_to_super` maps the previous level's ids into it. The
    /// sum of all member-list lengths equals the number of distinct original
    /// node ids at every level.
    pub fn coarsen(&mut self, feats: &LevelFeatures, adj: &LevelAdjacency, levels: usize) {
        info!(
            "Coarsening {} nodes, {} adjacency rows, {} levels",
            feats.len(),
            adj.len(),
            levels
        );
        let mut current_feats = feats.clone();
        let mut current_adj = adj.clone();
        let mut current_members: BTreeMap<u32, Vec<UserId>> =
            current_feats.keys().map(|&u| (u, vec![u])).collect();

        for level in 0..levels {
            self.coarsen_level(&current_feats, &current_adj, &current_members);

            let mut next_adj = LevelAdjacency::new();
            for (&u, neighbors) in &current_adj {
                let Some(&su) = self.node_to_super.get(&u) else { continue };
                for &v in neighbors {
                    let Some(&sv) = self.node_to_super.get(&v) else { continue };
                    if su == sv {
                        continue;
                    }
                    next_adj.entry(su).or_insert_with(Vec::new).push(sv);
                }
            }
            for list in next_adj.values_mut() {
                list.sort_unstable();
                list.dedup();
            }

            debug!(
                "Level {}: {} -> {} nodes, {} contracted adjacency rows",
                level,
                current_feats.len(),
                self.super_features.len(),
                next_adj.len()
            );

            current_feats = self.super_features.clone();
            current_members = self.super_members.clone();
            current_adj = next_adj;
        }
    }
}
