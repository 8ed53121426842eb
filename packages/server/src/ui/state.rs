//! Server state shared by all handlers.

use std::{sync::Arc, time::Duration};

use kidoku_shared::time::Clock;

use crate::{
    domain::{
        ChatRepository, ConnectionRegistry, MessagePusher, MessageRepository, TokenVerifier,
        UserRepository,
    },
    usecase::{
        AccessChatUseCase, ChatLocks, ChatNotifier, ConnectUserUseCase, DisconnectUserUseCase,
        EventBroadcaster, GetMessagesUseCase, ManageGroupUseCase, MarkAsReadUseCase,
        PresenceTracker, RoomSubscriptionUseCase, SearchUsersUseCase, SendMessageUseCase,
        TypingUseCase,
    },
};

/// 外部コラボレータ一式（永続化・接続管理・通知・認証・時計）
pub struct Collaborators {
    pub chat_repository: Arc<dyn ChatRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub registry: Arc<dyn ConnectionRegistry>,
    pub message_pusher: Arc<dyn MessagePusher>,
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub clock: Arc<dyn Clock>,
}

/// Shared application state
pub struct AppState {
    /// TokenVerifier（ハンドシェイク・HTTP 認証）
    pub token_verifier: Arc<dyn TokenVerifier>,
    /// MessagePusher（拒否したクライアントイベントへの error 通知）
    pub message_pusher: Arc<dyn MessagePusher>,
    /// 何も受信しない接続を切断するまでの時間
    pub idle_timeout: Duration,
    pub connect_user_usecase: Arc<ConnectUserUseCase>,
    pub disconnect_user_usecase: Arc<DisconnectUserUseCase>,
    pub room_subscription_usecase: Arc<RoomSubscriptionUseCase>,
    pub typing_usecase: Arc<TypingUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub mark_as_read_usecase: Arc<MarkAsReadUseCase>,
    pub get_messages_usecase: Arc<GetMessagesUseCase>,
    pub access_chat_usecase: Arc<AccessChatUseCase>,
    pub search_users_usecase: Arc<SearchUsersUseCase>,
    pub manage_group_usecase: Arc<ManageGroupUseCase>,
}

impl AppState {
    /// コラボレータから UseCase を組み立てる
    ///
    /// 会話ロックは送信・既読・グループ操作・ルーム参加で共有する。
    pub fn new(collaborators: Collaborators, idle_timeout: Duration) -> Self {
        let Collaborators {
            chat_repository,
            message_repository,
            user_repository,
            registry,
            message_pusher,
            token_verifier,
            clock,
        } = collaborators;

        let broadcaster = EventBroadcaster::new(registry.clone(), message_pusher.clone());
        let notifier = Arc::new(ChatNotifier::new(chat_repository.clone(), broadcaster.clone()));
        let chat_locks = Arc::new(ChatLocks::new());
        let search_users_usecase = Arc::new(SearchUsersUseCase::new(user_repository.clone()));
        let presence = Arc::new(PresenceTracker::new(
            user_repository,
            registry.clone(),
            broadcaster.clone(),
            clock.clone(),
        ));

        Self {
            connect_user_usecase: Arc::new(ConnectUserUseCase::new(
                registry.clone(),
                message_pusher.clone(),
                presence.clone(),
                broadcaster.clone(),
                clock.clone(),
            )),
            disconnect_user_usecase: Arc::new(DisconnectUserUseCase::new(
                registry.clone(),
                message_pusher.clone(),
                presence,
            )),
            room_subscription_usecase: Arc::new(RoomSubscriptionUseCase::new(
                chat_repository.clone(),
                registry.clone(),
                chat_locks.clone(),
            )),
            typing_usecase: Arc::new(TypingUseCase::new(
                chat_repository.clone(),
                registry.clone(),
                broadcaster.clone(),
            )),
            send_message_usecase: Arc::new(SendMessageUseCase::new(
                chat_repository.clone(),
                message_repository.clone(),
                registry.clone(),
                broadcaster.clone(),
                clock.clone(),
                chat_locks.clone(),
            )),
            mark_as_read_usecase: Arc::new(MarkAsReadUseCase::new(
                chat_repository.clone(),
                message_repository.clone(),
                broadcaster.clone(),
                chat_locks.clone(),
            )),
            get_messages_usecase: Arc::new(GetMessagesUseCase::new(
                chat_repository.clone(),
                message_repository,
            )),
            access_chat_usecase: Arc::new(AccessChatUseCase::new(
                chat_repository.clone(),
                notifier.clone(),
                clock.clone(),
            )),
            search_users_usecase,
            manage_group_usecase: Arc::new(ManageGroupUseCase::new(
                chat_repository,
                registry,
                notifier,
                broadcaster,
                clock,
                chat_locks,
            )),
            token_verifier,
            message_pusher,
            idle_timeout,
        }
    }
}
