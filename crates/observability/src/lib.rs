//! Tracing and logging setup shared by the service binary and its tests.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use tracing::{init, init_for_tests};
