//! Chat の最新状態を取得して通知する共通処理
//!
//! 会話の作成・メンバー変更の全経路がこの 1 つの操作を使う。

use std::sync::Arc;

use crate::domain::{Chat, ChatEvent, ChatId, ChatRepository};

use super::{UseCaseError, broadcaster::EventBroadcaster};

/// 通知するイベントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatNotice {
    /// `chat:new`
    Created,
    /// `group:update`
    Updated,
}

pub struct ChatNotifier {
    chat_repository: Arc<dyn ChatRepository>,
    broadcaster: EventBroadcaster,
}

impl ChatNotifier {
    pub fn new(chat_repository: Arc<dyn ChatRepository>, broadcaster: EventBroadcaster) -> Self {
        Self {
            chat_repository,
            broadcaster,
        }
    }

    /// 永続化済みの Chat を取得し、全メンバーの個人チャンネルとルームへ通知する
    pub async fn materialize_and_notify(
        &self,
        chat_id: ChatId,
        notice: ChatNotice,
    ) -> Result<Chat, UseCaseError> {
        let chat = self.chat_repository.get_chat(chat_id).await?;
        let event = match notice {
            ChatNotice::Created => ChatEvent::ChatNew(chat.clone()),
            ChatNotice::Updated => ChatEvent::GroupUpdate(chat.clone()),
        };
        self.broadcaster.to_members_and_room(&chat, &event).await;
        Ok(chat)
    }
}
