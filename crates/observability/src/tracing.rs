//! Tracing/logging initialization.
//!
//! `RUST_LOG` wins when set; otherwise the caller's default directive applies.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

fn filter_or(default_filter: &str) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Initialize JSON logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops). An unparsable
/// `default_filter` falls back to `info`.
pub fn init(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or(default_filter))
        .json()
        .with_current_span(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Human-readable output captured by the test harness.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or("warn"))
        .with_test_writer()
        .try_init();
}
