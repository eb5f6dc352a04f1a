//! Tracing/logging initialization.
//!
//! Import outcomes are logged with structured fields (`smartbill_id`,
//! `line_id`, `skip_reason`, ...), so production output is JSON, one event
//! per line.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset. SQL statement logging stays quiet.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize JSON logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .json()
        .with_current_span(true)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Compact output routed through the test writer so `cargo test` captures it.
pub fn init_test_writer() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("debug"))
        .compact()
        .with_test_writer()
        .try_init();
}
