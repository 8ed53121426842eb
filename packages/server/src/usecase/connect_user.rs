//! UseCase: WebSocket 接続の確立
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectUserUseCase::execute() メソッド
//! - 接続の登録（MessagePusher・Connection Registry）とプレゼンス遷移
//! - トークンのプロフィールがユーザー一覧用に保存されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の接続で online が通知される
//! - 正常系：2 台目の接続では通知されず、オンライン一覧だけが新しい接続に届く
//! - 異常系：同じ接続 ID の二重登録

use std::sync::Arc;

use kidoku_shared::time::Clock;

use crate::domain::{
    ChatEvent, ConnectionId, ConnectionRegistry, Identity, MessagePusher, PusherChannel,
    Registration, Timestamp, UserStatus,
};

use super::{UseCaseError, broadcaster::EventBroadcaster, presence_tracker::PresenceTracker};

/// 接続確立のユースケース
pub struct ConnectUserUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    presence: Arc<PresenceTracker>,
    broadcaster: EventBroadcaster,
    clock: Arc<dyn Clock>,
}

impl ConnectUserUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        presence: Arc<PresenceTracker>,
        broadcaster: EventBroadcaster,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            message_pusher,
            presence,
            broadcaster,
            clock,
        }
    }

    /// 認証済みユーザーの接続を登録する
    ///
    /// # Arguments
    ///
    /// * `identity` - ハンドシェイクで検証済みのユーザー
    /// * `connection_id` - サーバーが発行した接続 ID
    /// * `sender` - この接続へイベントを書き出すチャンネル
    pub async fn execute(
        &self,
        identity: Identity,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<Registration, UseCaseError> {
        let Identity { user_id, profile } = identity;

        // 1. Registry に登録（重複した接続 ID はここで拒否される）
        let connected_at = Timestamp::new(self.clock.now_millis());
        let registration = self
            .registry
            .register(user_id.clone(), connection_id, connected_at)
            .await?;

        // 2. 送信チャンネルを登録
        self.message_pusher
            .register_connection(connection_id, sender)
            .await;
        tracing::info!(
            "Connection '{}' registered for user '{}' ({:?})",
            connection_id,
            user_id,
            registration
        );

        // 3. 現在オンラインのユーザーを新しい接続に伝える
        for online in self.registry.users_with_connections().await {
            if online == user_id {
                continue;
            }
            let event = ChatEvent::UserStatus {
                user_id: online,
                status: UserStatus::Online,
                last_seen: None,
            };
            self.broadcaster.to_connection(&connection_id, &event).await;
        }

        // 4. プロフィールを保存（失敗しても接続は維持する）
        if let Err(e) = self.presence.remember_profile(&user_id, profile).await {
            tracing::warn!("Failed to store profile of '{}': {}", user_id, e);
        }

        // 5. 最初の接続なら online へ
        if registration == Registration::FirstConnection {
            if let Err(e) = self.presence.reconcile(&user_id).await {
                tracing::warn!("Failed to mark user '{}' online: {}", user_id, e);
            }
        }

        Ok(registration)
    }
}
