mod test_helpers;
mod test_similarity;

/// Opt-in log capture: `RUST_LOG=debug cargo test -- --nocapture`.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Candidate cap used across tests unless a test exercises the cap itself.
pub const TEST_LIMIT: usize = 1_000;

/// Seed used wherever a test needs reproducible sampling.
pub const TEST_SEED: u64 = 42;
