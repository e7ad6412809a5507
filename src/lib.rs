//! Gregar: affinity recommendations over a social-graph snapshot.
//!
//! The crate fuses three heterogeneous signal families (graph proximity,
//! profile-attribute similarity, and free-text interest similarity) into one
//! calibrated score in `[0, 1]`, and ranks candidate users (or clubs) for a
//! focal user. It also builds a coarsened approximation of the user graph
//! (supernodes with aggregated feature vectors) for cheap large-scale lookups,
//! and measures recommendation quality with seeded edge-holdout experiments.
//!
//! Pipeline, leaves first:
//!
//! - [`profile`]: immutable snapshot types (`UserProfile`, adjacency).
//! - [`tfidf`]: per-column document frequencies and IDF-weighted cosine.
//! - [`normalizer`]: per-signal calibration statistics and the stable sigmoid.
//! - [`similarity`]: the fusion engine producing one comparable score.
//! - [`candidates`]: bounded 1-/2-hop frontier expansion.
//! - [`recommender`]: the four ranking strategies plus supernode lookup.
//! - [`coarsen`]: greedy multilevel graph aggregation.
//! - [`eval`]: holdout-based offline quality measurement.
//!
//! All inputs are fully materialized before use; the core is synchronous and
//! never mutates shared state. Every randomized step takes an explicit seed,
//! so identical inputs always produce identical rankings and reports.

pub mod candidates;
pub mod coarsen;
pub mod eval;
pub mod normalizer;
pub mod profile;
pub mod recommender;
pub mod similarity;
pub mod tfidf;

#[cfg(test)]
mod tests;
