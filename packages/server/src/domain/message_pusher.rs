//! MessagePusher trait 定義
//!
//! 接続へのイベント送信の抽象化。具体的な実装（WebSocket など）は
//! Infrastructure 層が提供する。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ChatEvent, ConnectionId, MessagePushError};

/// 接続ごとの送信チャンネル（シリアライズ済み JSON を流す）
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除
    async fn unregister_connection(&self, connection_id: &ConnectionId);

    /// 特定の接続にイベントを送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &ChatEvent,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続にイベントを送信（一部の失敗は許容）
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &ChatEvent,
    ) -> Result<(), MessagePushError>;
}
