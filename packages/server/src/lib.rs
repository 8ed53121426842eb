//! Kidoku chat delivery server.
//!
//! Tracks live connections and presence, fans out messages with a read-receipt
//! snapshot, and keeps per-member unread counters consistent with `readBy`.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
