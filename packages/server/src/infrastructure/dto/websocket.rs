//! WebSocket event DTOs.
//!
//! Every frame is a JSON envelope `{"type": "<event>", "payload": {...}}`.

use serde::{Deserialize, Serialize};

use super::resource::{ChatDto, MessageDto};

// ========================================
// client → server
// ========================================

/// Events sent by clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum ClientEventDto {
    #[serde(rename = "join-room")]
    JoinRoom(RoomPayload),
    #[serde(rename = "leave-room")]
    LeaveRoom(RoomPayload),
    #[serde(rename = "typing-start")]
    TypingStart(RoomPayload),
    #[serde(rename = "typing-stop")]
    TypingStop(RoomPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub chat_id: String,
}

// ========================================
// server → client
// ========================================

/// Events pushed by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEventDto {
    #[serde(rename = "message:new")]
    MessageNew(MessageDto),
    #[serde(rename = "message:read")]
    MessageRead(MessageReadPayload),
    #[serde(rename = "chat:update")]
    ChatUpdate(ChatUpdatePayload),
    #[serde(rename = "chat:new")]
    ChatNew(ChatDto),
    #[serde(rename = "group:update")]
    GroupUpdate(ChatDto),
    #[serde(rename = "group:removed")]
    GroupRemoved(GroupRemovedPayload),
    #[serde(rename = "user:status")]
    UserStatus(UserStatusPayload),
    #[serde(rename = "typing:start")]
    TypingStart(TypingPayload),
    #[serde(rename = "typing:stop")]
    TypingStop(TypingPayload),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadPayload {
    pub chat_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatUpdatePayload {
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageDto>,
    pub unread_counter: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupRemovedPayload {
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusPayload {
    pub user_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub chat_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    pub message: String,
}
