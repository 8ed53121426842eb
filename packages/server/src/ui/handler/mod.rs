//! Request handlers.

mod error;
mod http;
mod websocket;

pub use http::{
    access_chat, add_to_group, create_group, get_messages, health_check, leave_group, list_chats,
    list_users, make_admin, mark_as_read, remove_from_group, send_message,
};
pub use websocket::websocket_handler;
