//! InMemory Message Repository 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ChatId, Message, MessageId, MessageRepository, RepositoryError, UserId};

#[derive(Default)]
struct MessageStore {
    /// Chat ごとのメッセージ（挿入順 = 作成順）
    by_chat: HashMap<ChatId, Vec<Message>>,
    /// MessageId → ChatId
    index: HashMap<MessageId, ChatId>,
}

/// インメモリ Message Repository 実装
#[derive(Default)]
pub struct InMemoryMessageRepository {
    store: Mutex<MessageStore>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create_message(&self, message: Message) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        store.index.insert(message.id(), message.chat_id());
        store
            .by_chat
            .entry(message.chat_id())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        let chat_id = store
            .index
            .remove(&message_id)
            .ok_or(RepositoryError::MessageNotFound(message_id))?;
        if let Some(messages) = store.by_chat.get_mut(&chat_id) {
            messages.retain(|m| m.id() != message_id);
        }
        Ok(())
    }

    async fn get_message(&self, message_id: MessageId) -> Result<Message, RepositoryError> {
        let store = self.store.lock().await;
        store
            .index
            .get(&message_id)
            .and_then(|chat_id| store.by_chat.get(chat_id))
            .and_then(|messages| messages.iter().find(|m| m.id() == message_id))
            .cloned()
            .ok_or(RepositoryError::MessageNotFound(message_id))
    }

    async fn list_messages(&self, chat_id: ChatId) -> Result<Vec<Message>, RepositoryError> {
        let store = self.store.lock().await;
        let mut messages = store.by_chat.get(&chat_id).cloned().unwrap_or_default();
        // 作成日時が同じ場合は挿入順を保つ（安定ソート）
        messages.sort_by_key(|m| m.created_at());
        Ok(messages)
    }

    async fn mark_chat_read_by(
        &self,
        chat_id: ChatId,
        user_id: &UserId,
    ) -> Result<usize, RepositoryError> {
        let mut store = self.store.lock().await;
        let updated = store
            .by_chat
            .get_mut(&chat_id)
            .map(|messages| {
                let mut updated = 0;
                for message in messages.iter_mut().filter(|m| !m.is_read_by(user_id)) {
                    message.mark_read_by(user_id.clone());
                    updated += 1;
                }
                updated
            })
            .unwrap_or(0);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageContent, MessageKind, Timestamp};

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn text_message(chat_id: ChatId, sender: &str, text: &str, at: i64) -> Message {
        Message::new(
            MessageId::generate(),
            chat_id,
            user(sender),
            MessageKind::Text,
            Some(MessageContent::new(text.to_string()).unwrap()),
            None,
            Timestamp::new(at),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_messages_oldest_first() {
        // テスト項目: メッセージ一覧は古い順で、他の会話のメッセージを含まない
        // given (前提条件):
        let repo = InMemoryMessageRepository::new();
        let chat_id = ChatId::generate();
        repo.create_message(text_message(chat_id, "alice", "second", 20)).await.unwrap();
        repo.create_message(text_message(chat_id, "bob", "first", 10)).await.unwrap();
        repo.create_message(text_message(ChatId::generate(), "bob", "other", 5)).await.unwrap();

        // when (操作):
        let messages = repo.list_messages(chat_id).await.unwrap();

        // then (期待する結果):
        let contents: Vec<&str> = messages
            .iter()
            .map(|m| m.content().unwrap().as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_mark_chat_read_by_is_idempotent() {
        // テスト項目: 既読付与は未読のメッセージだけに行われ、2 回目は 0 件
        // given (前提条件):
        let repo = InMemoryMessageRepository::new();
        let chat_id = ChatId::generate();
        repo.create_message(text_message(chat_id, "alice", "hi", 1)).await.unwrap();
        repo.create_message(text_message(chat_id, "bob", "yo", 2)).await.unwrap();

        // when (操作):
        let first = repo.mark_chat_read_by(chat_id, &user("bob")).await.unwrap();
        let second = repo.mark_chat_read_by(chat_id, &user("bob")).await.unwrap();

        // then (期待する結果): bob 自身のメッセージは既読済みなので 1 件のみ
        assert_eq!(first, 1);
        assert_eq!(second, 0);
        let messages = repo.list_messages(chat_id).await.unwrap();
        assert!(messages.iter().all(|m| m.is_read_by(&user("bob"))));
    }

    #[tokio::test]
    async fn test_delete_message() {
        // テスト項目: 削除したメッセージは取得できず、2 回目の削除は MessageNotFound
        // given (前提条件):
        let repo = InMemoryMessageRepository::new();
        let message = text_message(ChatId::generate(), "alice", "oops", 1);
        let message_id = message.id();
        repo.create_message(message).await.unwrap();

        // when (操作):
        let first = repo.delete_message(message_id).await;
        let second = repo.delete_message(message_id).await;

        // then (期待する結果):
        assert!(first.is_ok());
        assert_eq!(second, Err(RepositoryError::MessageNotFound(message_id)));
        assert!(repo.get_message(message_id).await.is_err());
    }
}
