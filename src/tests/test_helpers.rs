//! Shared fixtures for the test suite: small synthetic profile stores,
//! adjacency graphs, and sparse feature vectors.

use std::collections::BTreeMap;

use crate::profile::{AdjacencyGraph, ProfileStore, SparseVector, UserId, UserProfile};

/// A profile with every attribute missing; contributes zero signals.
pub fn empty_profile(id: UserId, n_cols: usize) -> UserProfile {
    UserProfile::new(id, n_cols)
}

/// A fully populated profile: every fixed signal defined, one text column
/// with a couple of tokens.
pub fn rich_profile(id: UserId) -> UserProfile {
    let mut p = UserProfile::new(id, 1);
    p.public_flag = 1;
    p.gender = 1;
    p.completion_percentage = 50;
    p.age = 30;
    p.region = [1, 2, 3];
    p.clubs = vec![10, 20];
    p.friends = vec![100, 200];
    p.token_cols[0].insert(1, 2);
    p.token_cols[0].insert(2, 1);
    p
}

pub fn store(profiles: Vec<UserProfile>) -> ProfileStore {
    profiles.into_iter().map(|p| (p.user_id, p)).collect()
}

pub fn adjacency(edges: &[(UserId, &[UserId])]) -> AdjacencyGraph {
    edges
        .iter()
        .map(|&(u, friends)| (u, friends.to_vec()))
        .collect()
}

pub fn feat(entries: &[(u64, f64)]) -> SparseVector {
    entries.iter().copied().collect()
}

pub fn feature_map(entries: Vec<(UserId, SparseVector)>) -> BTreeMap<UserId, SparseVector> {
    entries.into_iter().collect()
}

/// A 12-user ring where user i is connected to i±1 and i±2 (mod 12), so every
/// user has degree 4, the minimum the holdout evaluator accepts.
pub fn ring_world() -> (ProfileStore, AdjacencyGraph) {
    let n: u32 = 12;
    let mut profiles = Vec::new();
    let mut edges: AdjacencyGraph = BTreeMap::new();
    for i in 1..=n {
        let mut p = UserProfile::new(i, 1);
        p.public_flag = (i % 2) as i8;
        p.gender = ((i / 2) % 2) as i8;
        p.completion_percentage = (10 + i * 7 % 90) as i16;
        p.age = (18 + i % 40) as u16;
        p.region = [1, (i % 3) as i32, -1];
        p.clubs = vec![i % 4, 100 + i % 3];
        p.token_cols[0].insert(i % 5, 1 + i % 3);
        p.token_cols[0].insert(7, 1);
        let wrap = |x: i64| ((x - 1).rem_euclid(n as i64) + 1) as u32;
        let neighbors = vec![
            wrap(i as i64 - 2),
            wrap(i as i64 - 1),
            wrap(i as i64 + 1),
            wrap(i as i64 + 2),
        ];
        p.friends = neighbors.clone();
        edges.insert(i, neighbors);
        profiles.push(p);
    }
    (store(profiles), edges)
}
