//! Logging initialization.
//!
//! Registry operations emit `trace` events with the descriptor and the
//! before/after state; enable them with a filter such as
//! `fd_registry=trace`.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG`, when set, replaces the configured level.
///
/// ```ignore
/// use fd_registry::config::LoggingConfig;
///
/// fd_registry::logging::init(&LoggingConfig::default());
/// tracing::info!("echo server starting");
/// ```
pub fn init(config: &LoggingConfig) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(config.level.as_str()),
    };
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().with_ansi(true)).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
    }
}
