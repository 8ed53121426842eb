//! InMemory Chat Repository 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Chat, ChatId, ChatRepository, MessageId, RepositoryError, Timestamp, UserId};

/// インメモリ Chat Repository 実装
///
/// カウンタの増減は `Mutex` の内側で `Chat` のメソッドを直接呼ぶことで行い、
/// 呼び出し側に読み書きの隙間を作らない。
#[derive(Default)]
pub struct InMemoryChatRepository {
    chats: Mutex<HashMap<ChatId, Chat>>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn get_chat(&self, chat_id: ChatId) -> Result<Chat, RepositoryError> {
        let chats = self.chats.lock().await;
        chats
            .get(&chat_id)
            .cloned()
            .ok_or(RepositoryError::ChatNotFound(chat_id))
    }

    async fn save_chat(&self, chat: Chat) -> Result<(), RepositoryError> {
        let mut chats = self.chats.lock().await;
        chats.insert(chat.id(), chat);
        Ok(())
    }

    async fn find_direct_chat(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Chat>, RepositoryError> {
        let chats = self.chats.lock().await;
        Ok(chats
            .values()
            .find(|chat| !chat.is_group() && chat.is_member(a) && chat.is_member(b))
            .cloned())
    }

    async fn list_chats_of(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError> {
        let chats = self.chats.lock().await;
        let mut result: Vec<Chat> = chats
            .values()
            .filter(|chat| chat.is_member(user_id))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(result)
    }

    async fn record_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        unread_members: Vec<UserId>,
        at: Timestamp,
    ) -> Result<Chat, RepositoryError> {
        let mut chats = self.chats.lock().await;
        let chat = chats
            .get_mut(&chat_id)
            .ok_or(RepositoryError::ChatNotFound(chat_id))?;
        chat.record_message(message_id, &unread_members, at);
        Ok(chat.clone())
    }

    async fn reset_unread_counter(
        &self,
        chat_id: ChatId,
        user_id: &UserId,
    ) -> Result<Chat, RepositoryError> {
        let mut chats = self.chats.lock().await;
        let chat = chats
            .get_mut(&chat_id)
            .ok_or(RepositoryError::ChatNotFound(chat_id))?;
        // 非メンバーのリセットは何もしない（呼び出し側でメンバー確認済み）
        if let Err(e) = chat.reset_unread(user_id) {
            tracing::debug!("Skipped unread reset on chat '{}': {}", chat_id, e);
        }
        Ok(chat.clone())
    }
}
