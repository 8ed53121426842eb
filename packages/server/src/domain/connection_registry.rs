//! Connection Registry trait 定義
//!
//! どのユーザーがどの接続を持ち、各接続がどの会話ルームを開いているかを管理する。
//! ユーザーは任意個の接続（複数端末・複数タブ）を持てる。

use async_trait::async_trait;

use super::{ChatId, ConnectionId, RegistryError, Timestamp, UserId};

/// 接続登録の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// ユーザーの最初の接続（offline → online）
    FirstConnection,
    /// 既に他の接続がある
    AdditionalConnection,
}

/// 接続解除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub user_id: UserId,
    /// ユーザーの最後の接続だった（online → offline）
    pub was_last_connection: bool,
}

#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// 接続を登録
    async fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        connected_at: Timestamp,
    ) -> Result<Registration, RegistryError>;

    /// 接続を解除。未登録の接続なら `None`
    async fn unregister(&self, connection_id: &ConnectionId) -> Option<Departure>;

    /// 接続を会話ルームに参加させる（冪等）
    async fn join_room(
        &self,
        connection_id: &ConnectionId,
        chat_id: ChatId,
    ) -> Result<(), RegistryError>;

    /// 接続を会話ルームから退出させる（冪等）
    async fn leave_room(
        &self,
        connection_id: &ConnectionId,
        chat_id: ChatId,
    ) -> Result<(), RegistryError>;

    /// 接続の所有者
    async fn owner_of(&self, connection_id: &ConnectionId) -> Option<UserId>;

    /// ユーザーのいずれかの接続が会話ルームを開いているか
    async fn is_viewing(&self, user_id: &UserId, chat_id: ChatId) -> bool;

    /// `user_ids` のうち会話ルームを開いているユーザー（1 回のスナップショットで判定）
    async fn viewers_among(&self, chat_id: ChatId, user_ids: &[UserId]) -> Vec<UserId>;

    /// ユーザーの全接続
    async fn connections_of(&self, user_id: &UserId) -> Vec<ConnectionId>;

    /// 会話ルームに参加している全接続
    async fn connections_in_room(&self, chat_id: ChatId) -> Vec<ConnectionId>;

    /// 接続を 1 つ以上持つユーザー
    async fn users_with_connections(&self) -> Vec<UserId>;

    /// 全接続
    async fn all_connections(&self) -> Vec<ConnectionId>;
}
