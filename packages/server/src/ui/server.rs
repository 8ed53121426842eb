//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        access_chat, add_to_group, create_group, get_messages, health_check, leave_group,
        list_chats, list_users, make_admin, mark_as_read, remove_from_group, send_message,
        websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Kidoku chat delivery server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(AppState::new(collaborators, Duration::from_secs(60)));
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Build the router with every endpoint
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/users", get(list_users))
            .route("/api/chats", post(access_chat).get(list_chats))
            .route("/api/chats/group", post(create_group))
            .route("/api/chats/group/add", put(add_to_group))
            .route("/api/chats/group/remove", put(remove_from_group))
            .route("/api/chats/group/make-admin", put(make_admin))
            .route("/api/chats/group/leave", put(leave_group))
            .route("/api/messages", post(send_message))
            .route("/api/messages/read", put(mark_as_read))
            .route("/api/messages/{chat_id}", get(get_messages))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl+C / SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();

        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!("Kidoku server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?token=<token>", bind_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
