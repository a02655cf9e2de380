//! # Telemetry
//!
//! Structured logging setup.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages everywhere
//! - `RUST_LOG=toolshed=trace` - Trace for toolshed crates only
//! - Unset: the configured filter (default `info,toolshed=debug,sqlx=warn`)

use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber. `RUST_LOG` wins over
/// `default_filter`. Calling it twice is harmless: the second install is
/// refused and ignored.
///
/// ## Returns
/// `true` if this call installed the subscriber.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
