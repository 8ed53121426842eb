//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - ドメインイベントを DTO 経由で JSON にシリアライズし、接続へ送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! 送信先の決定（ルーム・ユーザー・全体）は UseCase 層が Connection Registry を使って行います。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ChatEvent, ConnectionId, MessagePushError, MessagePusher, PusherChannel},
    infrastructure::dto::websocket::ServerEventDto,
};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// pusher.register_connection(connection_id, tx).await;
/// pusher.push_to(&connection_id, &ChatEvent::GroupRemoved { chat_id }).await?;
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中の WebSocket sender
    connections: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    fn serialize(event: &ChatEvent) -> Result<String, MessagePushError> {
        serde_json::to_string(&ServerEventDto::from(event.clone()))
            .map_err(|e| MessagePushError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut connections = self.connections.lock().await;
        connections.insert(connection_id, sender);
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
    }

    async fn unregister_connection(&self, connection_id: &ConnectionId) {
        let mut connections = self.connections.lock().await;
        connections.remove(connection_id);
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id
        );
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &ChatEvent,
    ) -> Result<(), MessagePushError> {
        let json = Self::serialize(event)?;
        let connections = self.connections.lock().await;

        if let Some(sender) = connections.get(connection_id) {
            sender
                .send(json)
                .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
            tracing::debug!("Pushed '{}' to connection '{}'", event.name(), connection_id);
            Ok(())
        } else {
            Err(MessagePushError::ConnectionNotFound(
                connection_id.to_string(),
            ))
        }
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &ChatEvent,
    ) -> Result<(), MessagePushError> {
        if targets.is_empty() {
            return Ok(());
        }
        let json = Self::serialize(event)?;
        let connections = self.connections.lock().await;

        for target in targets {
            if let Some(sender) = connections.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                if let Err(e) = sender.send(json.clone()) {
                    tracing::warn!("Failed to push '{}' to connection '{}': {}", event.name(), target, e);
                } else {
                    tracing::debug!("Broadcasted '{}' to connection '{}'", event.name(), target);
                }
            } else {
                tracing::warn!(
                    "Connection '{}' not found during broadcast, skipping",
                    target
                );
            }
        }

        Ok(())
    }
}
