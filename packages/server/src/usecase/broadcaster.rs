//! イベント配信先の解決
//!
//! Connection Registry で宛先（ルーム・ユーザー個人・全体）を接続の集合に解決し、
//! MessagePusher で送信する。配信は永続化の成功後に行うベストエフォートで、
//! 失敗はログに残すだけで呼び出し元の操作を失敗させない。

use std::{collections::BTreeSet, sync::Arc};

use crate::domain::{Chat, ChatEvent, ChatId, ConnectionId, ConnectionRegistry, MessagePusher, UserId};

#[derive(Clone)]
pub struct EventBroadcaster {
    registry: Arc<dyn ConnectionRegistry>,
    pusher: Arc<dyn MessagePusher>,
}

impl EventBroadcaster {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, pusher: Arc<dyn MessagePusher>) -> Self {
        Self { registry, pusher }
    }

    /// ルームに参加している全接続へ
    pub async fn to_room(&self, chat_id: ChatId, event: &ChatEvent) {
        let targets = self.registry.connections_in_room(chat_id).await;
        self.deliver(targets, event).await;
    }

    /// ルームに参加している接続のうち `except` 以外へ
    pub async fn to_room_except(&self, chat_id: ChatId, except: &ConnectionId, event: &ChatEvent) {
        let targets = self
            .registry
            .connections_in_room(chat_id)
            .await
            .into_iter()
            .filter(|c| c != except)
            .collect();
        self.deliver(targets, event).await;
    }

    /// ユーザー個人チャンネル（そのユーザーの全接続）へ
    pub async fn to_user(&self, user_id: &UserId, event: &ChatEvent) {
        let targets = self.registry.connections_of(user_id).await;
        self.deliver(targets, event).await;
    }

    /// 全メンバーの個人チャンネルとルームへ（同じ接続には 1 回だけ）
    pub async fn to_members_and_room(&self, chat: &Chat, event: &ChatEvent) {
        let mut targets: BTreeSet<ConnectionId> = BTreeSet::new();
        for member in chat.members() {
            targets.extend(self.registry.connections_of(member).await);
        }
        targets.extend(self.registry.connections_in_room(chat.id()).await);
        self.deliver(targets.into_iter().collect(), event).await;
    }

    /// 特定の接続へ
    pub async fn to_connection(&self, connection_id: &ConnectionId, event: &ChatEvent) {
        if let Err(e) = self.pusher.push_to(connection_id, event).await {
            tracing::warn!(
                "Failed to push '{}' to connection '{}': {}",
                event.name(),
                connection_id,
                e
            );
        }
    }

    /// 全接続へ
    pub async fn to_everyone(&self, event: &ChatEvent) {
        let targets = self.registry.all_connections().await;
        self.deliver(targets, event).await;
    }

    async fn deliver(&self, targets: Vec<ConnectionId>, event: &ChatEvent) {
        if targets.is_empty() {
            return;
        }
        let count = targets.len();
        if let Err(e) = self.pusher.broadcast(targets, event).await {
            tracing::warn!("Failed to broadcast '{}': {}", event.name(), e);
        } else {
            tracing::debug!("Delivered '{}' to {} connection(s)", event.name(), count);
        }
    }
}
