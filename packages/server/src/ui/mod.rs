//! UI 層: axum のルーター、WebSocket / HTTP ハンドラ、共有状態

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use state::{AppState, Collaborators};
