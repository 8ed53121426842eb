//! UseCase: 会話のメッセージ履歴の取得

use std::sync::Arc;

use crate::domain::{ChatId, ChatRepository, Message, MessageRepository, UserId};

use super::UseCaseError;

pub struct GetMessagesUseCase {
    chat_repository: Arc<dyn ChatRepository>,
    message_repository: Arc<dyn MessageRepository>,
}

impl GetMessagesUseCase {
    pub fn new(
        chat_repository: Arc<dyn ChatRepository>,
        message_repository: Arc<dyn MessageRepository>,
    ) -> Self {
        Self {
            chat_repository,
            message_repository,
        }
    }

    /// メンバーだけが取得できる。古い順
    pub async fn execute(
        &self,
        chat_id: ChatId,
        requester: &UserId,
    ) -> Result<Vec<Message>, UseCaseError> {
        let chat = self.chat_repository.get_chat(chat_id).await?;
        if !chat.is_member(requester) {
            return Err(UseCaseError::Forbidden(format!(
                "user '{}' is not a member of chat '{}'",
                requester, chat_id
            )));
        }
        Ok(self.message_repository.list_messages(chat_id).await?)
    }
}
