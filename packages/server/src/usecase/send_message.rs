//! UseCase: メッセージ送信（ファンアウト）
//!
//! ## 処理の流れ
//!
//! 1. 会話のロックを取得（同じ会話の送信・既読処理は 1 つずつ実行される）
//! 2. 送信者がメンバーであることを確認し、メッセージを組み立てる
//! 3. プレゼンスのスナップショットを取る：送信者以外のメンバーのうち、
//!    この会話を開いている接続を持つユーザーは既読、それ以外は未読
//! 4. メッセージを保存し、未読メンバーのカウンタを 1 ずつ増やす。
//!    カウンタ更新に失敗した場合は保存したメッセージを削除して失敗を返す
//! 5. ルームへ `message:new`、各メンバーの個人チャンネルへ `chat:update` を通知
//!
//! スナップショットは保存より前に取る。保存後に会話を開いたユーザーは
//! このメッセージを既読にせず、自分で既読操作を行う。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 既読者・未読カウンタの決定と通知先の選定
//!
//! ### どのような状況を想定しているか
//! - 正常系：会話を開いている相手は既読、開いていない相手は未読
//! - 正常系：複数端末のうち 1 台でも会話を開いていれば既読
//! - 正常系：スナップショット後に会話を開いた相手は未読のまま `message:new` を受け取る
//! - 異常系：非メンバーの送信、存在しない会話、本文なし
//! - 異常系：カウンタ更新の失敗（メッセージは残らない）

use std::sync::Arc;

use kidoku_shared::time::Clock;

use crate::domain::{
    ChatEvent, ChatId, ChatRepository, ConnectionRegistry, MediaRef, Message, MessageContent,
    MessageId, MessageKind, MessageRepository, Timestamp, UserId,
};

use super::{UseCaseError, broadcaster::EventBroadcaster, keyed_lock::ChatLocks};

/// 送信するメッセージ
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub chat_id: ChatId,
    pub sender: UserId,
    pub kind: MessageKind,
    pub content: Option<MessageContent>,
    pub media: Option<MediaRef>,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    chat_repository: Arc<dyn ChatRepository>,
    message_repository: Arc<dyn MessageRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    broadcaster: EventBroadcaster,
    clock: Arc<dyn Clock>,
    chat_locks: Arc<ChatLocks>,
}

impl SendMessageUseCase {
    pub fn new(
        chat_repository: Arc<dyn ChatRepository>,
        message_repository: Arc<dyn MessageRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        broadcaster: EventBroadcaster,
        clock: Arc<dyn Clock>,
        chat_locks: Arc<ChatLocks>,
    ) -> Self {
        Self {
            chat_repository,
            message_repository,
            registry,
            broadcaster,
            clock,
            chat_locks,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Message)` - 保存されたメッセージ（既読者のスナップショットを含む）
    /// * `Err(UseCaseError)` - 送信失敗（状態は変更されていない）
    pub async fn execute(&self, command: SendMessageCommand) -> Result<Message, UseCaseError> {
        let SendMessageCommand {
            chat_id,
            sender,
            kind,
            content,
            media,
        } = command;

        let _guard = self.chat_locks.lock(&chat_id).await;

        // 1. 検証
        let chat = self.chat_repository.get_chat(chat_id).await?;
        if !chat.is_member(&sender) {
            return Err(UseCaseError::Forbidden(format!(
                "user '{}' is not a member of chat '{}'",
                sender, chat_id
            )));
        }
        let now = Timestamp::new(self.clock.now_millis());
        let mut message = Message::new(
            MessageId::generate(),
            chat_id,
            sender.clone(),
            kind,
            content,
            media,
            now,
        )?;

        // 2. プレゼンスのスナップショット
        let recipients: Vec<UserId> = chat
            .members()
            .iter()
            .filter(|m| **m != sender)
            .cloned()
            .collect();
        let viewers = self.registry.viewers_among(chat_id, &recipients).await;
        let unread: Vec<UserId> = recipients
            .into_iter()
            .filter(|r| !viewers.contains(r))
            .collect();
        for viewer in viewers {
            message.mark_read_by(viewer);
        }

        // 3. 永続化
        self.message_repository
            .create_message(message.clone())
            .await?;
        let chat = match self
            .chat_repository
            .record_message(chat_id, message.id(), unread, now)
            .await
        {
            Ok(chat) => chat,
            Err(e) => {
                self.discard(&message).await;
                return Err(e.into());
            }
        };
        tracing::debug!(
            "Message '{}' stored in chat '{}' (read by {})",
            message.id(),
            chat_id,
            message.read_by().len()
        );

        // 4. 通知
        self.broadcaster
            .to_room(chat_id, &ChatEvent::MessageNew(message.clone()))
            .await;
        for member in chat.members() {
            let event = ChatEvent::ChatUpdate {
                chat_id,
                last_message: Some(message.clone()),
                unread_counter: chat.unread_counter(member),
            };
            self.broadcaster.to_user(member, &event).await;
        }

        Ok(message)
    }

    async fn discard(&self, message: &Message) {
        if let Err(e) = self.message_repository.delete_message(message.id()).await {
            tracing::error!(
                "Failed to discard message '{}' after counter update failure: {}",
                message.id(),
                e
            );
        }
    }
}
