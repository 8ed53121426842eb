//! Server configuration (command-line flags with environment fallbacks).

use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "kidoku-server")]
#[command(about = "Real-time chat delivery server with presence-aware read receipts", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "KIDOKU_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "KIDOKU_PORT", default_value = "8080")]
    pub port: u16,

    /// HS256 secret used to verify identity tokens
    #[arg(long, env = "KIDOKU_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Seconds without any inbound frame before a connection is closed
    #[arg(
        long,
        env = "KIDOKU_IDLE_TIMEOUT_SECS",
        default_value = "60",
        value_parser = clap::value_parser!(u64).range(2..)
    )]
    pub idle_timeout_secs: u64,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, env = "KIDOKU_LOG_LEVEL", default_value = "debug")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
