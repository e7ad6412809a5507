//! Bounded candidate frontier: deduplicated ids within two hops of the focal
//! user, gathered with an explicit cap so a celebrity node cannot explode the
//! scoring set.
//!
//! All 1-hop ids are emitted before any 2-hop id, the focal user is never
//! included, and generation halts the moment the cap is reached rather than
//! collecting a full BFS and truncating. No score ordering happens here;
//! ranking is downstream.

use std::collections::HashSet;

use log::{debug, trace};

use crate::profile::{AdjacencyGraph, UserId};

/// Default cap on the frontier size.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 10_000;

/// Gather up to `limit` unique candidate ids within two hops of `user`.
///
/// Unknown or isolated users produce an empty vec. Duplicate entries in the
/// adjacency lists are deduplicated on the fly.
pub fn gather_candidates(adj: &AdjacencyGraph, user: UserId, limit: usize) -> Vec<UserId> {
    let mut out = Vec::new();
    let Some(friends) = adj.get(&user) else {
        trace!("User {} has no adjacency entry; empty frontier", user);
        return out;
    };
    let mut seen: HashSet<UserId> = HashSet::with_capacity(friends.len() * 2);

    for &f in friends {
        if f == user {
            continue;
        }
        if seen.insert(f) {
            out.push(f);
            if out.len() >= limit {
                debug!("Frontier for user {} capped at {} during 1-hop pass", user, limit);
                return out;
            }
        }
    }

    for &f in friends {
        let Some(fof) = adj.get(&f) else { continue };
        for &ff in fof {
            if ff == user {
                continue;
            }
            if seen.insert(ff) {
                out.push(ff);
                if out.len() >= limit {
                    debug!("Frontier for user {} capped at {} during 2-hop pass", user, limit);
                    return out;
                }
            }
        }
    }

    trace!("Frontier for user {}: {} candidates", user, out.len());
    out
}
