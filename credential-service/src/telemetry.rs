//! Tracing subscriber initialization.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Filtering follows `RUST_LOG`, defaulting to info for this crate.
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("credential_service=info,info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
