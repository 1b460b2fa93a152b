//! Tracing subscriber setup for binaries and tests embedding this crate.
//!
//! The database and staging modules log through the `log` facade while the
//! orchestration paths emit `tracing` events, so the subscriber installs a
//! `LogTracer` bridge to land both in one stream.

use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber with `RUST_LOG`-style filtering and a
/// `log`-to-`tracing` bridge. Calling it more than once is a no-op.
pub fn init_tracing() {
    if LogTracer::init().is_err() {
        // A logger is already installed; assume a subscriber is too.
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
