//! Data Transfer Objects (DTOs) for the chat server.
//!
//! DTOs are organized by protocol:
//! - `resource`: Message / Chat representations shared by both protocols
//! - `websocket`: WebSocket event DTOs
//! - `http`: HTTP API request / response DTOs

pub mod conversion;
pub mod http;
pub mod resource;
pub mod websocket;
