//! InMemory Connection Registry 実装
//!
//! ## 責務
//!
//! - ユーザー → 接続、接続 → 参加中ルーム、ルーム → 接続の対応を保持
//! - `is_viewing` を O(1) で答えるための (ユーザー, ルーム) 単位の接続数を保持
//!
//! 全ての状態は 1 つの `Mutex` の内側にあり、各操作は一貫したスナップショットを見る。
//! プロセス再起動で状態は失われる（プレゼンスは本質的に揮発性）。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ChatId, Connection, ConnectionId, ConnectionRegistry, Departure, Registration, RegistryError,
    Timestamp, UserId,
};

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, Connection>,
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
    rooms: HashMap<ChatId, HashSet<ConnectionId>>,
    /// ユーザー → ルーム → そのルームを開いている接続数
    viewing: HashMap<UserId, HashMap<ChatId, usize>>,
}

impl RegistryState {
    fn add_to_room(&mut self, user_id: &UserId, connection_id: ConnectionId, chat_id: ChatId) {
        self.rooms.entry(chat_id).or_default().insert(connection_id);
        *self
            .viewing
            .entry(user_id.clone())
            .or_default()
            .entry(chat_id)
            .or_insert(0) += 1;
    }

    fn remove_from_room(&mut self, user_id: &UserId, connection_id: &ConnectionId, chat_id: ChatId) {
        if let Some(members) = self.rooms.get_mut(&chat_id) {
            members.remove(connection_id);
            if members.is_empty() {
                self.rooms.remove(&chat_id);
            }
        }
        if let Some(per_chat) = self.viewing.get_mut(user_id) {
            if let Some(count) = per_chat.get_mut(&chat_id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    per_chat.remove(&chat_id);
                }
            }
            if per_chat.is_empty() {
                self.viewing.remove(user_id);
            }
        }
    }

    fn is_viewing(&self, user_id: &UserId, chat_id: ChatId) -> bool {
        self.viewing
            .get(user_id)
            .and_then(|per_chat| per_chat.get(&chat_id))
            .is_some_and(|count| *count > 0)
    }
}

/// インメモリ Connection Registry 実装
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        connected_at: Timestamp,
    ) -> Result<Registration, RegistryError> {
        let mut state = self.state.lock().await;
        if state.connections.contains_key(&connection_id) {
            return Err(RegistryError::DuplicateConnection(connection_id));
        }

        let user_connections = state.by_user.entry(user_id.clone()).or_default();
        let registration = if user_connections.is_empty() {
            Registration::FirstConnection
        } else {
            Registration::AdditionalConnection
        };
        user_connections.insert(connection_id);
        state.connections.insert(
            connection_id,
            Connection::new(connection_id, user_id.clone(), connected_at),
        );

        tracing::debug!(
            "Connection '{}' registered for user '{}' ({:?})",
            connection_id,
            user_id,
            registration
        );
        Ok(registration)
    }

    async fn unregister(&self, connection_id: &ConnectionId) -> Option<Departure> {
        let mut state = self.state.lock().await;
        let connection = state.connections.remove(connection_id)?;

        for chat_id in &connection.rooms {
            state.remove_from_room(&connection.user_id, connection_id, *chat_id);
        }

        let was_last_connection = match state.by_user.get_mut(&connection.user_id) {
            Some(user_connections) => {
                user_connections.remove(connection_id);
                user_connections.is_empty()
            }
            None => true,
        };
        if was_last_connection {
            state.by_user.remove(&connection.user_id);
        }

        tracing::debug!(
            "Connection '{}' of user '{}' unregistered (last: {})",
            connection_id,
            connection.user_id,
            was_last_connection
        );
        Some(Departure {
            user_id: connection.user_id,
            was_last_connection,
        })
    }

    async fn join_room(
        &self,
        connection_id: &ConnectionId,
        chat_id: ChatId,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.lock().await;
        let connection = state
            .connections
            .get_mut(connection_id)
            .ok_or(RegistryError::ConnectionNotFound(*connection_id))?;
        if !connection.rooms.insert(chat_id) {
            return Ok(());
        }
        let user_id = connection.user_id.clone();
        state.add_to_room(&user_id, *connection_id, chat_id);
        Ok(())
    }

    async fn leave_room(
        &self,
        connection_id: &ConnectionId,
        chat_id: ChatId,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.lock().await;
        let connection = state
            .connections
            .get_mut(connection_id)
            .ok_or(RegistryError::ConnectionNotFound(*connection_id))?;
        if !connection.rooms.remove(&chat_id) {
            return Ok(());
        }
        let user_id = connection.user_id.clone();
        state.remove_from_room(&user_id, connection_id, chat_id);
        Ok(())
    }

    async fn owner_of(&self, connection_id: &ConnectionId) -> Option<UserId> {
        let state = self.state.lock().await;
        state
            .connections
            .get(connection_id)
            .map(|connection| connection.user_id.clone())
    }

    async fn is_viewing(&self, user_id: &UserId, chat_id: ChatId) -> bool {
        let state = self.state.lock().await;
        state.is_viewing(user_id, chat_id)
    }

    async fn viewers_among(&self, chat_id: ChatId, user_ids: &[UserId]) -> Vec<UserId> {
        let state = self.state.lock().await;
        user_ids
            .iter()
            .filter(|user_id| state.is_viewing(user_id, chat_id))
            .cloned()
            .collect()
    }

    async fn connections_of(&self, user_id: &UserId) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        state
            .by_user
            .get(user_id)
            .map(|connections| connections.iter().copied().collect())
            .unwrap_or_default()
    }

    async fn connections_in_room(&self, chat_id: ChatId) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        state
            .rooms
            .get(&chat_id)
            .map(|connections| connections.iter().copied().collect())
            .unwrap_or_default()
    }

    async fn users_with_connections(&self) -> Vec<UserId> {
        let state = self.state.lock().await;
        state.by_user.keys().cloned().collect()
    }

    async fn all_connections(&self) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        state.connections.keys().copied().collect()
    }
}
