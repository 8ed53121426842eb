//! HTTP API request / response DTOs.

use serde::{Deserialize, Serialize};

/// `POST /api/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
}

/// `PUT /api/messages/read`, `PUT /api/chats/group/leave`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub chat_id: String,
}

/// `POST /api/chats`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessChatRequest {
    pub user_id: String,
}

/// `POST /api/chats/group`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub members: Vec<String>,
}

/// `PUT /api/chats/group/{add,remove,make-admin}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberRequest {
    pub chat_id: String,
    pub user_id: String,
}

/// `GET /api/users?search=`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Option<String>,
}

/// Plain message body for acknowledgements and errors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}
