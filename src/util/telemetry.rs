//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_DIRECTIVE: &str = "generation_gate=info";

/// Initialize tracing. Users can install their own subscriber; this helper
/// installs an env-filtered fmt subscriber only if none is set yet.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
