//! Tracing setup for the broker binary.
//!
//! The subscriber is installed once at startup with a default level. The
//! configured `logging.level` is swapped in through a reload handle once the
//! configuration has been read. `RUST_LOG`, when set, always wins.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Level used until the configuration is loaded.
pub const DEFAULT_LEVEL: &str = "info";

pub fn init_tracing() {
    init_tracing_with_level(DEFAULT_LEVEL);
}

pub fn init_tracing_with_level(level: &str) {
    let (filter, handle) = reload::Layer::new(startup_filter(level));
    if FILTER_HANDLE.set(handle).is_err() {
        // Already installed.
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

/// Switches the active filter to `level` unless RUST_LOG is set.
pub fn apply_logging_level(level: &str) {
    if rust_log_is_set() {
        tracing::debug!("RUST_LOG is set; ignoring logging.level");
        return;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    match handle.modify(|filter| *filter = EnvFilter::new(level)) {
        Ok(()) => tracing::debug!(level, "Log level applied"),
        Err(e) => tracing::warn!(error = %e, "Failed to apply log level"),
    }
}

fn rust_log_is_set() -> bool {
    std::env::var_os(EnvFilter::DEFAULT_ENV).is_some()
}

fn startup_filter(level: &str) -> EnvFilter {
    if rust_log_is_set() {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    EnvFilter::new(level)
}
