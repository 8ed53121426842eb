//! UseCase: WebSocket 接続の終了
//!
//! 切断の理由（クライアントの close・アイドルタイムアウト・送信エラー）に関わらず
//! 同じ後処理を 1 回だけ行う。

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRegistry, Departure, MessagePusher};

use super::presence_tracker::PresenceTracker;

/// 接続終了のユースケース
pub struct DisconnectUserUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    presence: Arc<PresenceTracker>,
}

impl DisconnectUserUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        presence: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            registry,
            message_pusher,
            presence,
        }
    }

    /// 接続を登録解除し、最後の接続なら offline へ遷移させる
    ///
    /// 既に解除済みの接続なら `None`（何もしない）。
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<Departure> {
        self.message_pusher
            .unregister_connection(connection_id)
            .await;

        let departure = self.registry.unregister(connection_id).await?;
        tracing::info!(
            "Connection '{}' of user '{}' closed",
            connection_id,
            departure.user_id
        );

        if departure.was_last_connection {
            if let Err(e) = self.presence.reconcile(&departure.user_id).await {
                tracing::warn!(
                    "Failed to mark user '{}' offline: {}",
                    departure.user_id,
                    e
                );
            }
        }

        Some(departure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatEvent, UserRepository, UserStatus},
        usecase::test_support::{TestContext, user},
    };

    fn setup(ctx: &TestContext) -> (Arc<PresenceTracker>, DisconnectUserUseCase) {
        let presence = Arc::new(PresenceTracker::new(
            ctx.user_repository.clone(),
            ctx.registry.clone(),
            ctx.broadcaster.clone(),
            ctx.clock.clone(),
        ));
        let usecase =
            DisconnectUserUseCase::new(ctx.registry.clone(), ctx.pusher.clone(), presence.clone());
        (presence, usecase)
    }

    #[tokio::test]
    async fn test_last_connection_marks_offline_once() {
        // テスト項目: 2 台のうち最後の接続が切れたときだけ offline が通知される
        // given (前提条件):
        let ctx = TestContext::new();
        let (presence, usecase) = setup(&ctx);
        let observer = ctx.connect("bob").await;
        let phone = ctx.connect("alice").await;
        let laptop = ctx.connect("alice").await;
        presence.reconcile(&user("alice")).await.unwrap();
        ctx.pusher.clear().await;

        // when (操作):
        let first = usecase.execute(&phone).await;
        let second = usecase.execute(&laptop).await;

        // then (期待する結果):
        assert_eq!(first.map(|d| d.was_last_connection), Some(false));
        assert_eq!(second.map(|d| d.was_last_connection), Some(true));
        let events = ctx.pusher.events_for(&observer).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ChatEvent::UserStatus { status: UserStatus::Offline, .. }
        ));
        let stored = ctx.user_repository.get_user(&user("alice")).await.unwrap();
        assert_eq!(stored.status(), UserStatus::Offline);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        // テスト項目: 同じ接続の二重解除は何もしない
        // given (前提条件):
        let ctx = TestContext::new();
        let (presence, usecase) = setup(&ctx);
        let connection = ctx.connect("alice").await;
        presence.reconcile(&user("alice")).await.unwrap();
        usecase.execute(&connection).await;
        ctx.pusher.clear().await;

        // when (操作):
        let result = usecase.execute(&connection).await;

        // then (期待する結果):
        assert!(result.is_none());
        assert!(ctx.pusher.named("user:status").await.is_empty());
    }
}
