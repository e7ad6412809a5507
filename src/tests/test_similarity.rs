use approx::assert_relative_eq;

use crate::normalizer::{sigmoid, Signal, SignalStats};
use crate::similarity::{
    cosine_counts, raw_signal_similarity, region_similarity, set_similarity, sparse_cosine,
    sparse_dot, SimilarityEngine,
};
use crate::tests::test_helpers::{empty_profile, feat, rich_profile};
use crate::tfidf::TfIdfIndex;

// ============================================================================
// Primitive similarity tests
// ============================================================================

#[test]
fn test_set_similarity_overlap() {
    // |A∩B| = 2, |A| = 3, |B| = 2 -> 2 / sqrt(6)
    let a = vec![1u32, 2, 3];
    let b = vec![2u32, 3];
    assert_relative_eq!(set_similarity(&a, &b), 2.0 / 6.0f64.sqrt(), epsilon = 1e-12);
}

#[test]
fn test_set_similarity_empty_is_zero() {
    assert_eq!(set_similarity(&[], &[1, 2]), 0.0);
    assert_eq!(set_similarity(&[1, 2], &[]), 0.0);
}

#[test]
fn test_set_similarity_identical() {
    let a = vec![5u32, 9];
    assert_relative_eq!(set_similarity(&a, &a), 1.0, epsilon = 1e-12);
}

#[test]
fn test_region_similarity_partial_parts() {
    // One matching part; 2 non-missing on the left, 3 on the right.
    let a = [1, 2, -1];
    let b = [1, 3, 4];
    assert_relative_eq!(region_similarity(&a, &b), 1.0 / 6.0f64.sqrt(), epsilon = 1e-12);
}

#[test]
fn test_region_similarity_fully_missing_side() {
    assert_eq!(region_similarity(&[-1, -1, -1], &[1, 2, 3]), 0.0);
}

#[test]
fn test_cosine_counts_identical_is_one() {
    let mut a = std::collections::HashMap::new();
    a.insert(1u32, 3u32);
    a.insert(2, 4);
    assert_relative_eq!(cosine_counts(&a, &a), 1.0, epsilon = 1e-12);
}

#[test]
fn test_cosine_counts_disjoint_is_zero() {
    let mut a = std::collections::HashMap::new();
    a.insert(1u32, 3u32);
    let mut b = std::collections::HashMap::new();
    b.insert(2u32, 5u32);
    assert_eq!(cosine_counts(&a, &b), 0.0);
}

#[test]
fn test_sparse_dot_and_cosine() {
    let a = feat(&[(0, 1.0), (1, 2.0)]);
    let b = feat(&[(1, 3.0), (2, 4.0)]);
    assert_relative_eq!(sparse_dot(&a, &b), 6.0, epsilon = 1e-12);
    let cos = 6.0 / (5.0f64.sqrt() * 25.0f64.sqrt());
    assert_relative_eq!(sparse_cosine(&a, &b), cos, epsilon = 1e-12);
}

#[test]
fn test_sparse_cosine_zero_norm_guard() {
    let a = feat(&[(0, 0.0)]);
    let b = feat(&[(0, 1.0)]);
    assert_eq!(sparse_cosine(&a, &b), 0.0);
    assert!(sparse_cosine(&a, &b).is_finite());
}

// ============================================================================
// Raw signal gating
// ============================================================================

#[test]
fn test_raw_signal_skips_unknown_sides() {
    let a = rich_profile(1);
    let b = empty_profile(2, 1);
    for signal in Signal::ALL {
        assert_eq!(raw_signal_similarity(&a, &b, signal), None);
    }
}

#[test]
fn test_raw_signal_ratio_fields() {
    let mut a = empty_profile(1, 0);
    let mut b = empty_profile(2, 0);
    a.age = 20;
    b.age = 40;
    a.completion_percentage = 30;
    b.completion_percentage = 90;
    assert_eq!(raw_signal_similarity(&a, &b, Signal::Age), Some(0.5));
    assert_relative_eq!(
        raw_signal_similarity(&a, &b, Signal::Completion).unwrap(),
        1.0 / 3.0,
        epsilon = 1e-12
    );
}

#[test]
fn test_raw_signal_boolean_fields() {
    let mut a = empty_profile(1, 0);
    let mut b = empty_profile(2, 0);
    a.public_flag = 1;
    b.public_flag = 0;
    a.gender = 0;
    b.gender = 0;
    assert_eq!(raw_signal_similarity(&a, &b, Signal::Public), Some(0.0));
    assert_eq!(raw_signal_similarity(&a, &b, Signal::Gender), Some(1.0));
}

// ============================================================================
// Fused score
// ============================================================================

#[test]
fn test_score_in_unit_interval_and_symmetric() {
    let engine = SimilarityEngine::new(1);
    let a = rich_profile(1);
    let mut b = rich_profile(2);
    b.age = 45;
    b.clubs = vec![20, 30];
    let ab = engine.score(&a, &b);
    let ba = engine.score(&b, &a);
    assert!((0.0..=1.0).contains(&ab));
    assert_relative_eq!(ab, ba, epsilon = 1e-12);
}

#[test]
fn test_score_zero_signals_is_zero() {
    let engine = SimilarityEngine::new(1);
    let a = empty_profile(1, 1);
    let b = empty_profile(2, 1);
    assert_eq!(engine.score(&a, &b), 0.0);
}

#[test]
fn test_score_single_signal_exact_fusion() {
    // Only age contributes: raw 0.5 -> fallback z = 0 -> sigmoid 0.5.
    // S = 0.5, F = 1/7 (seven fixed signals, zero text columns).
    let engine = SimilarityEngine::new(0);
    let mut a = empty_profile(1, 0);
    let mut b = empty_profile(2, 0);
    a.age = 20;
    b.age = 40;
    let s = 0.5f64;
    let f = 1.0 / 7.0;
    let expected = 2.0 * s * f / (s + f);
    assert_relative_eq!(engine.score(&a, &b), expected, epsilon = 1e-12);
}

#[test]
fn test_score_canonical_total_signal_count() {
    // The coverage denominator is canonically 7 fixed signals + text columns.
    assert_eq!(Signal::COUNT, 7);
    // With one text column contributing alongside all seven fixed signals,
    // coverage reaches exactly 1.
    let engine = SimilarityEngine::new(1);
    let a = rich_profile(1);
    let s = engine.score(&a, &a);
    // Full coverage and identical raws: fused = 2*S/(S+1) with S = sigmoid(3).
    let sig = sigmoid(3.0);
    assert_relative_eq!(s, 2.0 * sig / (sig + 1.0), epsilon = 1e-12);
}

#[test]
fn test_score_self_similarity_not_pinned_to_one() {
    // Self-similarity is the sigmoid of the self-match z-scores, not 1.0.
    let engine = SimilarityEngine::new(1);
    let a = rich_profile(1);
    let s = engine.score(&a, &a);
    assert!(s > 0.9 && s < 1.0);
}

#[test]
fn test_score_rewards_coverage_over_single_strength() {
    // One perfect signal vs. many decent ones: breadth must win.
    let narrow_engine = SimilarityEngine::new(0);
    let mut a = empty_profile(1, 0);
    let mut b = empty_profile(2, 0);
    a.gender = 1;
    b.gender = 1; // single perfect match
    let narrow = narrow_engine.score(&a, &b);

    let broad = narrow_engine.score(&rich_profile(3), &rich_profile(4));
    assert!(broad > narrow);
}

#[test]
fn test_score_uses_measured_stats_when_present() {
    let mut stats = SignalStats::new(0);
    // Baseline mean 0.5, stddev 0.25: raw 0.5 z-scores to 0 either way, but a
    // raw of 0.75 now lands at z = 1 instead of the fallback z = 1.5.
    stats.set(Signal::Age, 0.5, 0.25);
    let engine = SimilarityEngine::new(0).with_stats(stats);
    let fallback_engine = SimilarityEngine::new(0);

    let mut a = empty_profile(1, 0);
    let mut b = empty_profile(2, 0);
    a.age = 30;
    b.age = 40; // raw 0.75
    assert!(engine.score(&a, &b) < fallback_engine.score(&a, &b));
}

#[test]
fn test_score_text_column_uses_index_when_attached() {
    let a = rich_profile(1);
    let mut b = rich_profile(2);
    b.token_cols[0].clear();
    b.token_cols[0].insert(1, 5);
    b.token_cols[0].insert(9, 1);

    let profiles = crate::tests::test_helpers::store(vec![a.clone(), b.clone()]);
    let index = TfIdfIndex::build(&profiles, 1);

    let plain = SimilarityEngine::new(1).score(&a, &b);
    let weighted = SimilarityEngine::new(1).with_index(&index).score(&a, &b);
    // Both valid scores; IDF re-weighting moves the text signal.
    assert!((0.0..=1.0).contains(&plain));
    assert!((0.0..=1.0).contains(&weighted));
    assert!((plain - weighted).abs() > 1e-9);
}

#[test]
fn test_score_finite_under_all_missing_combinations() {
    // Toggle each attribute independently; no combination may produce NaN/Inf.
    let variants: Vec<_> = (0..8u32)
        .map(|mask| {
            let mut p = empty_profile(mask, 1);
            if mask & 1 != 0 {
                p.age = 20 + mask as u16;
            }
            if mask & 2 != 0 {
                p.clubs = vec![mask];
            }
            if mask & 4 != 0 {
                p.region = [mask as i32 % 3, -1, -1];
            }
            p
        })
        .collect();
    let engine = SimilarityEngine::new(1);
    for a in &variants {
        for b in &variants {
            let s = engine.score(a, b);
            assert!(s.is_finite(), "non-finite score for masks {} {}", a.user_id, b.user_id);
            assert!((0.0..=1.0).contains(&s));
        }
    }
}
