//! UseCase: グループの作成とメンバー管理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 作成・メンバー追加・除名・管理者昇格・退出
//! - 変更後の通知（`chat:new` / `group:update` / `group:removed`）
//!
//! ### どのような状況を想定しているか
//! - 正常系：追加されたメンバーのカウンタは 0 から始まる
//! - 正常系：除名後に再追加するとカウンタは 0 から
//! - 異常系：管理者以外の操作、最後の管理者の退出、1:1 会話へのグループ操作

use std::sync::Arc;

use kidoku_shared::time::Clock;

use crate::domain::{
    Chat, ChatEvent, ChatId, ChatRepository, ConnectionRegistry, GroupName, Timestamp, UserId,
};

use super::{
    UseCaseError,
    broadcaster::EventBroadcaster,
    keyed_lock::ChatLocks,
    notifier::{ChatNotice, ChatNotifier},
};

pub struct ManageGroupUseCase {
    chat_repository: Arc<dyn ChatRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    notifier: Arc<ChatNotifier>,
    broadcaster: EventBroadcaster,
    clock: Arc<dyn Clock>,
    chat_locks: Arc<ChatLocks>,
}

impl ManageGroupUseCase {
    pub fn new(
        chat_repository: Arc<dyn ChatRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        notifier: Arc<ChatNotifier>,
        broadcaster: EventBroadcaster,
        clock: Arc<dyn Clock>,
        chat_locks: Arc<ChatLocks>,
    ) -> Self {
        Self {
            chat_repository,
            registry,
            notifier,
            broadcaster,
            clock,
            chat_locks,
        }
    }

    /// グループを作成する。作成者が唯一の管理者になる
    pub async fn create(
        &self,
        creator: UserId,
        name: GroupName,
        members: Vec<UserId>,
    ) -> Result<Chat, UseCaseError> {
        let chat = Chat::group(ChatId::generate(), name, creator, members, self.now())?;
        let chat_id = chat.id();
        self.chat_repository.save_chat(chat).await?;
        tracing::info!("Group '{}' created", chat_id);

        self.notifier
            .materialize_and_notify(chat_id, ChatNotice::Created)
            .await
    }

    /// メンバーを追加する（管理者のみ）
    pub async fn add_member(
        &self,
        actor: &UserId,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Chat, UseCaseError> {
        let _guard = self.chat_locks.lock(&chat_id).await;

        let mut chat = self.load_group(chat_id).await?;
        ensure_admin(&chat, actor)?;
        chat.add_member(user_id.clone(), self.now())?;
        self.chat_repository.save_chat(chat).await?;

        let chat = self
            .notifier
            .materialize_and_notify(chat_id, ChatNotice::Updated)
            .await?;
        self.broadcaster
            .to_user(&user_id, &ChatEvent::ChatNew(chat.clone()))
            .await;
        Ok(chat)
    }

    /// メンバーを除名する（管理者のみ）
    pub async fn remove_member(
        &self,
        actor: &UserId,
        chat_id: ChatId,
        user_id: &UserId,
    ) -> Result<Chat, UseCaseError> {
        let _guard = self.chat_locks.lock(&chat_id).await;

        let chat = self.load_group(chat_id).await?;
        ensure_admin(&chat, actor)?;
        self.detach(chat, user_id).await
    }

    /// メンバーを管理者に昇格する（管理者のみ）
    pub async fn make_admin(
        &self,
        actor: &UserId,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Chat, UseCaseError> {
        let _guard = self.chat_locks.lock(&chat_id).await;

        let mut chat = self.load_group(chat_id).await?;
        ensure_admin(&chat, actor)?;
        chat.promote(user_id, self.now())?;
        self.chat_repository.save_chat(chat).await?;

        self.notifier
            .materialize_and_notify(chat_id, ChatNotice::Updated)
            .await
    }

    /// 自分からグループを抜ける
    pub async fn leave(&self, actor: &UserId, chat_id: ChatId) -> Result<Chat, UseCaseError> {
        let _guard = self.chat_locks.lock(&chat_id).await;

        let chat = self.load_group(chat_id).await?;
        if !chat.is_member(actor) {
            return Err(UseCaseError::Forbidden(format!(
                "user '{}' is not a member of chat '{}'",
                actor, chat_id
            )));
        }
        self.detach(chat, actor).await
    }

    /// メンバーを外し、そのユーザーの接続をルームから退出させて通知する
    async fn detach(&self, mut chat: Chat, user_id: &UserId) -> Result<Chat, UseCaseError> {
        let chat_id = chat.id();
        chat.remove_member(user_id, self.now())?;
        self.chat_repository.save_chat(chat).await?;

        for connection_id in self.registry.connections_of(user_id).await {
            // 切断と競合した接続は既に消えている
            let _ = self.registry.leave_room(&connection_id, chat_id).await;
        }
        self.broadcaster
            .to_user(user_id, &ChatEvent::GroupRemoved { chat_id })
            .await;
        tracing::info!("User '{}' left group '{}'", user_id, chat_id);

        self.notifier
            .materialize_and_notify(chat_id, ChatNotice::Updated)
            .await
    }

    async fn load_group(&self, chat_id: ChatId) -> Result<Chat, UseCaseError> {
        let chat = self.chat_repository.get_chat(chat_id).await?;
        if !chat.is_group() {
            return Err(UseCaseError::NotFound(format!("group '{}' not found", chat_id)));
        }
        Ok(chat)
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

fn ensure_admin(chat: &Chat, actor: &UserId) -> Result<(), UseCaseError> {
    if chat.is_admin(actor) {
        Ok(())
    } else {
        Err(UseCaseError::Forbidden(format!(
            "only admins can manage group '{}'",
            chat.id()
        )))
    }
}
