//! Structured logging for the scan engine.
//!
//! Scan cascade decisions (which parser claimed a region, which candidates
//! were tried and rejected) are logged at debug level via `tracing` so they
//! can be enabled per-run without recompiling.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the default subscriber. Safe to call more than once; only the
/// first call has an effect.
pub fn init_default() {
    init_with_filter("warn,shardscan=info");
}

/// Initialize the subscriber with an explicit default filter, overridden by
/// `RUST_LOG` when set.
pub fn init_with_filter(default_filter: &str) {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_ok()
    {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}
