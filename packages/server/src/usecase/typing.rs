//! UseCase: 入力中表示の中継
//!
//! 永続化はしない。発信元の接続を除くルーム内の接続へそのまま中継する。

use std::sync::Arc;

use crate::domain::{ChatEvent, ChatId, ChatRepository, ConnectionId, ConnectionRegistry};

use super::{UseCaseError, broadcaster::EventBroadcaster};

pub struct TypingUseCase {
    chat_repository: Arc<dyn ChatRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    broadcaster: EventBroadcaster,
}

impl TypingUseCase {
    pub fn new(
        chat_repository: Arc<dyn ChatRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            chat_repository,
            registry,
            broadcaster,
        }
    }

    /// `typing` が true なら `typing:start`、false なら `typing:stop`
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        chat_id: ChatId,
        typing: bool,
    ) -> Result<(), UseCaseError> {
        let user_id = self
            .registry
            .owner_of(connection_id)
            .await
            .ok_or_else(|| UseCaseError::NotFound(format!("connection '{}' not found", connection_id)))?;
        let chat = self.chat_repository.get_chat(chat_id).await?;
        if !chat.is_member(&user_id) {
            return Err(UseCaseError::Forbidden(format!(
                "user '{}' is not a member of chat '{}'",
                user_id, chat_id
            )));
        }

        let event = if typing {
            ChatEvent::TypingStart { chat_id, user_id }
        } else {
            ChatEvent::TypingStop { chat_id, user_id }
        };
        self.broadcaster
            .to_room_except(chat_id, connection_id, &event)
            .await;
        Ok(())
    }
}
