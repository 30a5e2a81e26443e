//! Telemetry helpers for structured logging and tracing.

/// Initialize tracing for the gate. Users can install their own subscriber;
/// this helper installs an env-based subscriber if none is set, defaulting
/// to `taskgate=info` when `RUST_LOG` is absent.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("taskgate=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
