//! UseCase: 既読処理（未読カウンタと既読者の整合）
//!
//! 会話の未読カウンタを 0 に戻し、その会話の全メッセージの既読者にユーザーを加える。
//! 送信処理と同じ会話ロックの中で行うので、送信と既読が競合しても
//! 「カウンタが 0 なのに未読のメッセージが残る」状態にはならない。
//! 何度実行しても結果は同じ。

use std::sync::Arc;

use crate::domain::{ChatEvent, ChatId, ChatRepository, MessageRepository, UserId};

use super::{UseCaseError, broadcaster::EventBroadcaster, keyed_lock::ChatLocks};

/// 既読処理のユースケース
pub struct MarkAsReadUseCase {
    chat_repository: Arc<dyn ChatRepository>,
    message_repository: Arc<dyn MessageRepository>,
    broadcaster: EventBroadcaster,
    chat_locks: Arc<ChatLocks>,
}

impl MarkAsReadUseCase {
    pub fn new(
        chat_repository: Arc<dyn ChatRepository>,
        message_repository: Arc<dyn MessageRepository>,
        broadcaster: EventBroadcaster,
        chat_locks: Arc<ChatLocks>,
    ) -> Self {
        Self {
            chat_repository,
            message_repository,
            broadcaster,
            chat_locks,
        }
    }

    /// 既読処理を実行
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 新たに既読になったメッセージの数
    /// * `Err(UseCaseError)` - 会話が存在しない・メンバーでない・永続化の失敗
    pub async fn execute(&self, chat_id: ChatId, user_id: &UserId) -> Result<usize, UseCaseError> {
        let _guard = self.chat_locks.lock(&chat_id).await;

        let chat = self.chat_repository.get_chat(chat_id).await?;
        if !chat.is_member(user_id) {
            return Err(UseCaseError::Forbidden(format!(
                "user '{}' is not a member of chat '{}'",
                user_id, chat_id
            )));
        }

        self.chat_repository
            .reset_unread_counter(chat_id, user_id)
            .await?;
        let updated = self
            .message_repository
            .mark_chat_read_by(chat_id, user_id)
            .await?;
        tracing::debug!(
            "User '{}' read chat '{}' ({} message(s) newly read)",
            user_id,
            chat_id,
            updated
        );

        let read = ChatEvent::MessageRead {
            chat_id,
            user_id: user_id.clone(),
        };
        self.broadcaster.to_room(chat_id, &read).await;
        let update = ChatEvent::ChatUpdate {
            chat_id,
            last_message: None,
            unread_counter: 0,
        };
        self.broadcaster.to_user(user_id, &update).await;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Message, MessageContent, MessageId, MessageKind, Timestamp},
        usecase::test_support::{NOW, TestContext, user},
    };

    fn usecase(ctx: &TestContext) -> MarkAsReadUseCase {
        MarkAsReadUseCase::new(
            ctx.chat_repository.clone(),
            ctx.message_repository.clone(),
            ctx.broadcaster.clone(),
            ctx.chat_locks.clone(),
        )
    }

    /// 未読のメッセージを保存し、カウンタを進める
    async fn deliver_unread(ctx: &TestContext, chat_id: ChatId, sender: &str, to: &str) {
        let message = Message::new(
            MessageId::generate(),
            chat_id,
            user(sender),
            MessageKind::Text,
            Some(MessageContent::new("hi".to_string()).unwrap()),
            None,
            Timestamp::new(NOW),
        )
        .unwrap();
        let message_id = message.id();
        ctx.message_repository.create_message(message).await.unwrap();
        ctx.chat_repository
            .record_message(chat_id, message_id, vec![user(to)], Timestamp::new(NOW))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mark_read_resets_counter_and_read_by() {
        // テスト項目: 既読にするとカウンタが 0 になり、全メッセージの既読者に含まれる
        // given (前提条件):
        let ctx = TestContext::new();
        let chat = ctx.direct_chat("alice", "bob").await;
        deliver_unread(&ctx, chat.id(), "alice", "bob").await;
        deliver_unread(&ctx, chat.id(), "alice", "bob").await;
        let alice = ctx.connect("alice").await;
        let bob = ctx.connect("bob").await;
        ctx.open_room(&alice, chat.id()).await;

        // when (操作):
        let result = usecase(&ctx).execute(chat.id(), &user("bob")).await;

        // then (期待する結果):
        assert_eq!(result, Ok(2));
        let stored = ctx.chat_repository.get_chat(chat.id()).await.unwrap();
        assert_eq!(stored.unread_counter(&user("bob")), 0);
        let messages = ctx.message_repository.list_messages(chat.id()).await.unwrap();
        assert!(messages.iter().all(|m| m.is_read_by(&user("bob"))));

        assert_eq!(
            ctx.pusher.events_for(&alice).await,
            vec![ChatEvent::MessageRead {
                chat_id: chat.id(),
                user_id: user("bob"),
            }]
        );
        assert_eq!(
            ctx.pusher.events_for(&bob).await,
            vec![ChatEvent::ChatUpdate {
                chat_id: chat.id(),
                last_message: None,
                unread_counter: 0,
            }]
        );
    }

    #[tokio::test]
    async fn test_mark_read_twice_has_no_additional_effect() {
        // テスト項目: 2 回目の既読処理では状態が変わらない
        // given (前提条件):
        let ctx = TestContext::new();
        let chat = ctx.direct_chat("alice", "bob").await;
        deliver_unread(&ctx, chat.id(), "alice", "bob").await;
        let usecase = usecase(&ctx);
        usecase.execute(chat.id(), &user("bob")).await.unwrap();
        let before_chat = ctx.chat_repository.get_chat(chat.id()).await.unwrap();
        let before_messages = ctx.message_repository.list_messages(chat.id()).await.unwrap();

        // when (操作):
        let result = usecase.execute(chat.id(), &user("bob")).await;

        // then (期待する結果):
        assert_eq!(result, Ok(0));
        assert_eq!(ctx.chat_repository.get_chat(chat.id()).await.unwrap(), before_chat);
        assert_eq!(
            ctx.message_repository.list_messages(chat.id()).await.unwrap(),
            before_messages
        );
    }

    #[tokio::test]
    async fn test_mark_read_by_non_member_is_forbidden() {
        // テスト項目: メンバーでないユーザーの既読処理は拒否される
        // given (前提条件):
        let ctx = TestContext::new();
        let chat = ctx.direct_chat("alice", "bob").await;

        // when (操作):
        let result = usecase(&ctx).execute(chat.id(), &user("mallory")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::Forbidden(_))));
        assert!(ctx.pusher.named("message:read").await.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_unknown_chat_is_not_found() {
        // テスト項目: 存在しない会話の既読処理は NotFound
        // given (前提条件):
        let ctx = TestContext::new();

        // when (操作):
        let result = usecase(&ctx).execute(ChatId::generate(), &user("bob")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::NotFound(_))));
    }
}
