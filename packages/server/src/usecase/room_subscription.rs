//! UseCase: 会話ルームへの参加・退出（接続単位）
//!
//! ルームに参加している接続は「その会話を開いている」とみなされ、
//! 送信時のスナップショットで既読になる。
//!
//! 参加は会話ロックの中で行う。メンバー確認と Registry への参加の間に
//! グループから外されると、外されたユーザーの接続がルームに残ってしまう。

use std::sync::Arc;

use crate::domain::{ChatId, ChatRepository, ConnectionId, ConnectionRegistry, UserId};

use super::{UseCaseError, keyed_lock::ChatLocks};

pub struct RoomSubscriptionUseCase {
    chat_repository: Arc<dyn ChatRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    chat_locks: Arc<ChatLocks>,
}

impl RoomSubscriptionUseCase {
    pub fn new(
        chat_repository: Arc<dyn ChatRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        chat_locks: Arc<ChatLocks>,
    ) -> Self {
        Self {
            chat_repository,
            registry,
            chat_locks,
        }
    }

    /// ルームに参加する。会話のメンバーでなければ Forbidden
    pub async fn join(&self, connection_id: &ConnectionId, chat_id: ChatId) -> Result<(), UseCaseError> {
        let user_id = self.owner(connection_id).await?;
        let _guard = self.chat_locks.lock(&chat_id).await;
        let chat = self.chat_repository.get_chat(chat_id).await?;
        if !chat.is_member(&user_id) {
            return Err(UseCaseError::Forbidden(format!(
                "user '{}' is not a member of chat '{}'",
                user_id, chat_id
            )));
        }
        self.registry.join_room(connection_id, chat_id).await?;
        tracing::debug!("Connection '{}' joined room '{}'", connection_id, chat_id);
        Ok(())
    }

    /// ルームから退出する。参加していなければ何もしない
    pub async fn leave(&self, connection_id: &ConnectionId, chat_id: ChatId) -> Result<(), UseCaseError> {
        self.registry.leave_room(connection_id, chat_id).await?;
        tracing::debug!("Connection '{}' left room '{}'", connection_id, chat_id);
        Ok(())
    }

    async fn owner(&self, connection_id: &ConnectionId) -> Result<UserId, UseCaseError> {
        self.registry
            .owner_of(connection_id)
            .await
            .ok_or_else(|| UseCaseError::NotFound(format!("connection '{}' not found", connection_id)))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::{
        domain::{Chat, MessageId, RepositoryError, Timestamp},
        infrastructure::repository::InMemoryChatRepository,
        usecase::{
            ManageGroupUseCase,
            test_support::{TestContext, user},
        },
    };

    fn usecase(ctx: &TestContext) -> RoomSubscriptionUseCase {
        RoomSubscriptionUseCase::new(
            ctx.chat_repository.clone(),
            ctx.registry.clone(),
            ctx.chat_locks.clone(),
        )
    }

    /// 最初の get_chat で Chat を読んだ直後に止まる ChatRepository
    struct PausingChatRepository {
        inner: Arc<InMemoryChatRepository>,
        paused: AtomicBool,
        reached: Notify,
        resume: Notify,
    }

    impl PausingChatRepository {
        fn new(inner: Arc<InMemoryChatRepository>) -> Self {
            Self {
                inner,
                paused: AtomicBool::new(false),
                reached: Notify::new(),
                resume: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl ChatRepository for PausingChatRepository {
        async fn get_chat(&self, chat_id: ChatId) -> Result<Chat, RepositoryError> {
            let chat = self.inner.get_chat(chat_id).await?;
            if !self.paused.swap(true, Ordering::SeqCst) {
                self.reached.notify_one();
                self.resume.notified().await;
            }
            Ok(chat)
        }

        async fn save_chat(&self, chat: Chat) -> Result<(), RepositoryError> {
            self.inner.save_chat(chat).await
        }

        async fn find_direct_chat(
            &self,
            a: &UserId,
            b: &UserId,
        ) -> Result<Option<Chat>, RepositoryError> {
            self.inner.find_direct_chat(a, b).await
        }

        async fn list_chats_of(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError> {
            self.inner.list_chats_of(user_id).await
        }

        async fn record_message(
            &self,
            chat_id: ChatId,
            message_id: MessageId,
            unread_members: Vec<UserId>,
            at: Timestamp,
        ) -> Result<Chat, RepositoryError> {
            self.inner
                .record_message(chat_id, message_id, unread_members, at)
                .await
        }

        async fn reset_unread_counter(
            &self,
            chat_id: ChatId,
            user_id: &UserId,
        ) -> Result<Chat, RepositoryError> {
            self.inner.reset_unread_counter(chat_id, user_id).await
        }
    }

    #[tokio::test]
    async fn test_member_joins_and_leaves_room() {
        // テスト項目: メンバーはルームに参加でき、退出すると閲覧中でなくなる
        // given (前提条件):
        let ctx = TestContext::new();
        let chat = ctx.direct_chat("alice", "bob").await;
        let bob = ctx.connect("bob").await;
        let usecase = usecase(&ctx);

        // when (操作):
        usecase.join(&bob, chat.id()).await.unwrap();
        let viewing_after_join = ctx.registry.is_viewing(&user("bob"), chat.id()).await;
        usecase.leave(&bob, chat.id()).await.unwrap();
        let viewing_after_leave = ctx.registry.is_viewing(&user("bob"), chat.id()).await;

        // then (期待する結果):
        assert!(viewing_after_join);
        assert!(!viewing_after_leave);
    }

    #[tokio::test]
    async fn test_outsider_cannot_join() {
        // テスト項目: メンバーでないユーザーはルームに参加できない
        // given (前提条件):
        let ctx = TestContext::new();
        let chat = ctx.direct_chat("alice", "bob").await;
        let mallory = ctx.connect("mallory").await;

        // when (操作):
        let result = usecase(&ctx).join(&mallory, chat.id()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::Forbidden(_))));
        assert!(ctx.registry.connections_in_room(chat.id()).await.is_empty());
    }

    #[tokio::test]
    async fn test_join_unknown_chat_is_not_found() {
        // テスト項目: 存在しない会話のルームには参加できない
        // given (前提条件):
        let ctx = TestContext::new();
        let bob = ctx.connect("bob").await;

        // when (操作):
        let result = usecase(&ctx).join(&bob, ChatId::generate()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::NotFound(_))));
    }

    fn usecase_for_groups(ctx: &TestContext) -> ManageGroupUseCase {
        ManageGroupUseCase::new(
            ctx.chat_repository.clone(),
            ctx.registry.clone(),
            ctx.notifier(),
            ctx.broadcaster.clone(),
            ctx.clock.clone(),
            ctx.chat_locks.clone(),
        )
    }

    #[tokio::test]
    async fn test_removal_during_join_leaves_no_connection_in_room() {
        // テスト項目: メンバー確認の直後にグループから外されても、外されたユーザーの接続はルームに残らない
        // given (前提条件):
        let ctx = TestContext::new();
        let chat_id = ctx.group_chat("team", "alice", &["bob", "carol"]).await.id();
        let bob = ctx.connect("bob").await;
        let pausing = Arc::new(PausingChatRepository::new(ctx.chat_repository.clone()));
        let rooms = Arc::new(RoomSubscriptionUseCase::new(
            pausing.clone(),
            ctx.registry.clone(),
            ctx.chat_locks.clone(),
        ));
        let groups = Arc::new(usecase_for_groups(&ctx));

        // when (操作): bob の参加がメンバー確認で止まっている間に bob を外す
        let join = tokio::spawn({
            let rooms = rooms.clone();
            async move { rooms.join(&bob, chat_id).await }
        });
        pausing.reached.notified().await;
        let removal = tokio::spawn({
            let groups = groups.clone();
            async move {
                groups
                    .remove_member(&user("alice"), chat_id, &user("bob"))
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        pausing.resume.notify_one();
        let joined = join.await.unwrap();
        let removed = removal.await.unwrap();

        // then (期待する結果):
        assert_eq!(joined, Ok(()));
        assert!(!removed.unwrap().is_member(&user("bob")));
        assert!(!ctx.registry.is_viewing(&user("bob"), chat_id).await);
        assert!(ctx.registry.connections_in_room(chat_id).await.is_empty());
    }
}
