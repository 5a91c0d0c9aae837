//! # Logging
//!
//! Installs a `tracing_subscriber::fmt` subscriber filtered by `RUST_LOG`,
//! falling back to `info`. Installing twice is harmless: the second call
//! leaves the first subscriber in place.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber, ignoring an existing one.
pub fn init() {
    let _ = tracing_subscriber::fmt().with_env_filter(filter()).try_init();
}

/// Like [`init`], but writes through the test harness so output is captured.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_test_writer()
        .try_init();
}
