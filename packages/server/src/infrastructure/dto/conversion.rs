//! Conversion logic from domain entities / events to DTOs.

use kidoku_shared::time::timestamp_to_rfc3339;

use crate::domain::{Chat, ChatEvent, Message, User};

use super::{
    resource::{ChatDto, MessageDto, UserDto},
    websocket::{
        ChatUpdatePayload, ErrorPayload, GroupRemovedPayload, MessageReadPayload, ServerEventDto,
        TypingPayload, UserStatusPayload,
    },
};

impl From<&Message> for MessageDto {
    fn from(model: &Message) -> Self {
        Self {
            id: model.id().to_string(),
            chat_id: model.chat_id().to_string(),
            sender: model.sender().to_string(),
            kind: model.kind().as_str().to_string(),
            content: model.content().map(|c| c.as_str().to_string()),
            media_url: model.media().map(|m| m.as_str().to_string()),
            read_by: model.read_by().iter().map(|u| u.to_string()).collect(),
            created_at: timestamp_to_rfc3339(model.created_at().value()),
        }
    }
}

impl From<&Chat> for ChatDto {
    fn from(model: &Chat) -> Self {
        Self {
            id: model.id().to_string(),
            is_group: model.is_group(),
            name: model.name().map(|n| n.as_str().to_string()),
            members: model.members().iter().map(|u| u.to_string()).collect(),
            admins: model.admins().iter().map(|u| u.to_string()).collect(),
            unread_counters: model
                .unread_counters()
                .iter()
                .map(|(u, count)| (u.to_string(), *count))
                .collect(),
            last_message: model.last_message().map(|id| id.to_string()),
            created_at: timestamp_to_rfc3339(model.created_at().value()),
            updated_at: timestamp_to_rfc3339(model.updated_at().value()),
        }
    }
}

impl From<&User> for UserDto {
    fn from(model: &User) -> Self {
        Self {
            id: model.id().to_string(),
            name: model.profile().name.clone(),
            email: model.profile().email.clone(),
            status: model.status().as_str().to_string(),
            last_seen: model.last_seen().map(|t| timestamp_to_rfc3339(t.value())),
        }
    }
}

impl From<ChatEvent> for ServerEventDto {
    fn from(event: ChatEvent) -> Self {
        match event {
            ChatEvent::MessageNew(message) => Self::MessageNew(MessageDto::from(&message)),
            ChatEvent::MessageRead { chat_id, user_id } => Self::MessageRead(MessageReadPayload {
                chat_id: chat_id.to_string(),
                user_id: user_id.into_string(),
            }),
            ChatEvent::ChatUpdate {
                chat_id,
                last_message,
                unread_counter,
            } => Self::ChatUpdate(ChatUpdatePayload {
                chat_id: chat_id.to_string(),
                last_message: last_message.as_ref().map(MessageDto::from),
                unread_counter,
            }),
            ChatEvent::ChatNew(chat) => Self::ChatNew(ChatDto::from(&chat)),
            ChatEvent::GroupUpdate(chat) => Self::GroupUpdate(ChatDto::from(&chat)),
            ChatEvent::GroupRemoved { chat_id } => Self::GroupRemoved(GroupRemovedPayload {
                chat_id: chat_id.to_string(),
            }),
            ChatEvent::UserStatus {
                user_id,
                status,
                last_seen,
            } => Self::UserStatus(UserStatusPayload {
                user_id: user_id.into_string(),
                status: status.as_str().to_string(),
                last_seen: last_seen.map(|t| timestamp_to_rfc3339(t.value())),
            }),
            ChatEvent::TypingStart { chat_id, user_id } => Self::TypingStart(TypingPayload {
                chat_id: chat_id.to_string(),
                user_id: user_id.into_string(),
            }),
            ChatEvent::TypingStop { chat_id, user_id } => Self::TypingStop(TypingPayload {
                chat_id: chat_id.to_string(),
                user_id: user_id.into_string(),
            }),
            ChatEvent::Error { message } => Self::Error(ErrorPayload { message }),
        }
    }
}
