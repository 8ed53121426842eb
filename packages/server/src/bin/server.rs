//! Kidoku chat delivery server.
//!
//! Run with:
//! ```not_rust
//! KIDOKU_JWT_SECRET=secret cargo run --bin kidoku-server
//! cargo run --bin kidoku-server -- --host 0.0.0.0 --port 3000 --jwt-secret secret
//! ```

use std::sync::Arc;

use clap::Parser;
use kidoku_server::{
    config::ServerConfig,
    infrastructure::{
        auth::JwtTokenVerifier,
        message_pusher::WebSocketMessagePusher,
        registry::InMemoryConnectionRegistry,
        repository::{InMemoryChatRepository, InMemoryMessageRepository, InMemoryUserRepository},
    },
    ui::{AppState, Collaborators, Server},
};
use kidoku_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    // Initialize dependencies in order:
    // 1. Repositories
    // 2. Connection Registry
    // 3. MessagePusher
    // 4. TokenVerifier
    // 5. AppState (UseCases)
    // 6. Server

    // 1. Create Repositories (in-memory database)
    let chat_repository = Arc::new(InMemoryChatRepository::new());
    let message_repository = Arc::new(InMemoryMessageRepository::new());
    let user_repository = Arc::new(InMemoryUserRepository::new());

    // 2. Create Connection Registry
    let registry = Arc::new(InMemoryConnectionRegistry::new());

    // 3. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 4. Create TokenVerifier (HS256 JWT)
    let token_verifier = Arc::new(JwtTokenVerifier::new(config.jwt_secret.as_bytes()));

    // 5. Create AppState
    let state = AppState::new(
        Collaborators {
            chat_repository,
            message_repository,
            user_repository,
            registry,
            message_pusher,
            token_verifier,
            clock: Arc::new(SystemClock),
        },
        config.idle_timeout(),
    );

    // 6. Create and run the server
    let server = Server::new(state);
    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
