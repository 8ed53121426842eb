//! Logging setup utilities for Kidoku binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the server library crate, this crate, `tower_http`
/// request traces and the binary itself. `RUST_LOG` overrides everything.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "kidoku-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use kidoku_shared::logger::setup_logger;
///
/// setup_logger("kidoku-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the default `EnvFilter` directive string.
fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    format!(
        "kidoku_server={level},{shared}={level},{bin}={level},tower_http={level}",
        level = default_log_level,
        shared = env!("CARGO_PKG_NAME").replace('-', "_"),
        bin = binary_name.replace('-', "_"),
    )
}
