//! UseCase テスト用の共通部品

use std::sync::Arc;

use async_trait::async_trait;
use kidoku_shared::time::FixedClock;
use tokio::sync::Mutex;

use crate::{
    domain::{
        Chat, ChatEvent, ChatId, ChatRepository, ConnectionId, ConnectionRegistry,
        MessagePushError, MessagePusher, PusherChannel, Timestamp, UserId,
    },
    infrastructure::{
        registry::InMemoryConnectionRegistry,
        repository::{InMemoryChatRepository, InMemoryMessageRepository, InMemoryUserRepository},
    },
};

use super::{ChatLocks, ChatNotifier, EventBroadcaster};

pub const NOW: i64 = 1_700_000_000_000;

pub fn user(id: &str) -> UserId {
    UserId::new(id.to_string()).unwrap()
}

/// 送信されたイベントを記録するだけの MessagePusher
#[derive(Default)]
pub struct RecordingPusher {
    pushed: Mutex<Vec<(ConnectionId, ChatEvent)>>,
}

impl RecordingPusher {
    pub async fn events_for(&self, connection_id: &ConnectionId) -> Vec<ChatEvent> {
        self.pushed
            .lock()
            .await
            .iter()
            .filter(|(c, _)| c == connection_id)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub async fn named(&self, name: &str) -> Vec<(ConnectionId, ChatEvent)> {
        self.pushed
            .lock()
            .await
            .iter()
            .filter(|(_, e)| e.name() == name)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.pushed.lock().await.clear();
    }
}

#[async_trait]
impl MessagePusher for RecordingPusher {
    async fn register_connection(&self, _connection_id: ConnectionId, _sender: PusherChannel) {}

    async fn unregister_connection(&self, _connection_id: &ConnectionId) {}

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &ChatEvent,
    ) -> Result<(), MessagePushError> {
        self.pushed.lock().await.push((*connection_id, event.clone()));
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &ChatEvent,
    ) -> Result<(), MessagePushError> {
        let mut pushed = self.pushed.lock().await;
        for target in targets {
            pushed.push((target, event.clone()));
        }
        Ok(())
    }
}

/// インメモリ実装で組み立てた UseCase の依存一式
pub struct TestContext {
    pub chat_repository: Arc<InMemoryChatRepository>,
    pub message_repository: Arc<InMemoryMessageRepository>,
    pub user_repository: Arc<InMemoryUserRepository>,
    pub registry: Arc<InMemoryConnectionRegistry>,
    pub pusher: Arc<RecordingPusher>,
    pub broadcaster: EventBroadcaster,
    pub clock: Arc<FixedClock>,
    pub chat_locks: Arc<ChatLocks>,
}

impl TestContext {
    pub fn new() -> Self {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let pusher = Arc::new(RecordingPusher::default());
        let broadcaster = EventBroadcaster::new(registry.clone(), pusher.clone());
        Self {
            chat_repository: Arc::new(InMemoryChatRepository::new()),
            message_repository: Arc::new(InMemoryMessageRepository::new()),
            user_repository: Arc::new(InMemoryUserRepository::new()),
            registry,
            pusher,
            broadcaster,
            clock: Arc::new(FixedClock::new(NOW)),
            chat_locks: Arc::new(ChatLocks::new()),
        }
    }

    pub fn notifier(&self) -> Arc<ChatNotifier> {
        Arc::new(ChatNotifier::new(
            self.chat_repository.clone(),
            self.broadcaster.clone(),
        ))
    }

    /// Registry に接続を 1 つ登録する（MessagePusher は RecordingPusher なので登録不要）
    pub async fn connect(&self, user_id: &str) -> ConnectionId {
        let connection_id = ConnectionId::generate();
        self.registry
            .register(user(user_id), connection_id, Timestamp::new(NOW))
            .await
            .unwrap();
        connection_id
    }

    pub async fn open_room(&self, connection_id: &ConnectionId, chat_id: ChatId) {
        self.registry.join_room(connection_id, chat_id).await.unwrap();
    }

    pub async fn direct_chat(&self, a: &str, b: &str) -> Chat {
        let chat = Chat::direct(ChatId::generate(), user(a), user(b), Timestamp::new(NOW)).unwrap();
        self.chat_repository.save_chat(chat.clone()).await.unwrap();
        chat
    }

    pub async fn group_chat(&self, name: &str, creator: &str, others: &[&str]) -> Chat {
        let chat = Chat::group(
            ChatId::generate(),
            crate::domain::GroupName::new(name.to_string()).unwrap(),
            user(creator),
            others.iter().map(|o| user(o)),
            Timestamp::new(NOW),
        )
        .unwrap();
        self.chat_repository.save_chat(chat.clone()).await.unwrap();
        chat
    }
}
