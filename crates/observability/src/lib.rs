//! Process-wide tracing/logging setup.

/// Initialize process-wide observability (JSON logs, `RUST_LOG` filter).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

/// Human-readable output captured by the test harness.
pub fn init_for_tests() {
    tracing::init_test_writer();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
