//! UseCase: 1:1 会話の取得・作成と会話一覧

use std::sync::Arc;

use kidoku_shared::time::Clock;

use crate::domain::{Chat, ChatError, ChatId, ChatRepository, Timestamp, UserId};

use super::{
    UseCaseError,
    keyed_lock::KeyedLocks,
    notifier::{ChatNotice, ChatNotifier},
};

/// 1:1 会話の取得結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessedChat {
    pub chat: Chat,
    /// この呼び出しで作成された
    pub created: bool,
}

pub struct AccessChatUseCase {
    chat_repository: Arc<dyn ChatRepository>,
    notifier: Arc<ChatNotifier>,
    clock: Arc<dyn Clock>,
    /// 同じ 2 人の会話が重複して作られないよう、組ごとに直列化する
    pair_locks: KeyedLocks<(UserId, UserId)>,
}

impl AccessChatUseCase {
    pub fn new(
        chat_repository: Arc<dyn ChatRepository>,
        notifier: Arc<ChatNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chat_repository,
            notifier,
            clock,
            pair_locks: KeyedLocks::new(),
        }
    }

    /// `requester` と `other` の 1:1 会話を返す。なければ作成して両者に `chat:new` を通知
    pub async fn access(
        &self,
        requester: UserId,
        other: UserId,
    ) -> Result<AccessedChat, UseCaseError> {
        if requester == other {
            return Err(ChatError::SelfChat.into());
        }
        let pair = if requester < other {
            (requester.clone(), other.clone())
        } else {
            (other.clone(), requester.clone())
        };
        let _guard = self.pair_locks.lock(&pair).await;

        if let Some(chat) = self
            .chat_repository
            .find_direct_chat(&requester, &other)
            .await?
        {
            return Ok(AccessedChat {
                chat,
                created: false,
            });
        }

        let now = Timestamp::new(self.clock.now_millis());
        let chat = Chat::direct(ChatId::generate(), requester, other, now)?;
        let chat_id = chat.id();
        self.chat_repository.save_chat(chat).await?;
        tracing::info!("Direct chat '{}' created", chat_id);

        let chat = self
            .notifier
            .materialize_and_notify(chat_id, ChatNotice::Created)
            .await?;
        Ok(AccessedChat {
            chat,
            created: true,
        })
    }

    /// ユーザーが参加している会話（更新が新しい順）
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Chat>, UseCaseError> {
        Ok(self.chat_repository.list_chats_of(user_id).await?)
    }
}
