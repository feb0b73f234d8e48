//! Structured logging setup for applications embedding engines.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable: engine lifecycle events
/// at `info`, nothing from other crates.
pub const DEFAULT_LOG_FILTER: &str = "serial_task_queue=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_FILTER`].
///
/// Lines carry the emitting thread's name, which for engine workers is the
/// configured engine name. Does nothing if a subscriber is already installed.
pub fn init_tracing() {
    let _ = init_tracing_with(DEFAULT_LOG_FILTER);
}

/// Like [`init_tracing`] with a custom fallback filter directive.
///
/// Returns whether this call installed the subscriber.
#[must_use]
pub fn init_tracing_with(fallback: &str) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
