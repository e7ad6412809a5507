//! Snapshot data model: user profiles, adjacency, sparse feature vectors.
//!
//! Everything here is loaded once per session and treated as immutable by the
//! rest of the crate. Tokenization and vocabulary assignment happen upstream;
//! profiles arrive with text columns already reduced to `token_id -> count`
//! maps, one map per configured text column.

use std::collections::{BTreeMap, HashMap};

/// User identifier. Club ids share the same space width but never mix with
/// user ids in any output.
pub type UserId = u32;
pub type ClubId = u32;

/// Token key namespaced per text column: `(column_index << 32) | token_id`.
///
/// Merged cross-column vectors (TF-IDF features, supernode aggregates) key on
/// this so token id 17 in column 0 can never collide with token id 17 in
/// column 1.
pub type TokenKey = u64;

/// Sparse feature vector keyed by namespaced token.
pub type SparseVector = HashMap<TokenKey, f64>;

/// uid -> profile, ordered so every full scan is deterministic.
pub type ProfileStore = BTreeMap<UserId, UserProfile>;

/// uid -> ordered friend list. May be asymmetric and may contain duplicates;
/// consumers dedup where it matters.
pub type AdjacencyGraph = BTreeMap<UserId, Vec<UserId>>;

/// Builds the namespaced key for `token_id` in text column `col`.
#[inline]
pub fn token_key(col: usize, token_id: u32) -> TokenKey {
    ((col as u64) << 32) | token_id as u64
}

/// One user's materialized snapshot record.
///
/// Missing-data conventions follow the source dataset: tri-state categoricals
/// use -1 for unknown, `completion_percentage` uses -1, `age` uses 0, and
/// region parts use -1 per part. The similarity engine skips (never
/// zero-fills) any signal either side leaves unknown.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub user_id: UserId,
    /// -1 unknown, else 0/1.
    pub public_flag: i8,
    /// -1 unknown, else 0/1.
    pub gender: i8,
    /// -1 unknown, else 1..=100.
    pub completion_percentage: i16,
    /// 0 unknown, positive otherwise.
    pub age: u16,
    /// Three hierarchical parts (coarse to fine), -1 per absent part.
    pub region: [i32; 3],
    /// Club memberships.
    pub clubs: Vec<ClubId>,
    /// Friend ids as a profile attribute; used only for set similarity,
    /// distinct from graph traversal over [`AdjacencyGraph`].
    pub friends: Vec<UserId>,
    /// One `token_id -> count` map per configured text column, positional.
    /// Invariant: length equals the number of configured text columns.
    pub token_cols: Vec<HashMap<u32, u32>>,
}

impl UserProfile {
    pub fn new(user_id: UserId, n_text_columns: usize) -> Self {
        Self {
            user_id,
            public_flag: -1,
            gender: -1,
            completion_percentage: -1,
            age: 0,
            region: [-1, -1, -1],
            clubs: Vec::new(),
            friends: Vec::new(),
            token_cols: vec![HashMap::new(); n_text_columns],
        }
    }

    /// Number of non-missing region parts.
    #[inline]
    pub fn region_parts_set(&self) -> usize {
        self.region.iter().filter(|&&p| p >= 0).count()
    }
}
