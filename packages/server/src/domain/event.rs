//! サーバーからクライアントへ通知するイベント（ドメイン表現）
//!
//! ワイヤ形式への変換は Infrastructure 層の DTO が担当する。

use super::{
    entity::{Chat, Message},
    value_object::{ChatId, Timestamp, UserId, UserStatus},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// `message:new`: ルームへ。`read_by` は送信時点のスナップショット
    MessageNew(Message),
    /// `message:read`: ルームへ
    MessageRead { chat_id: ChatId, user_id: UserId },
    /// `chat:update`: メンバー個人へ
    ChatUpdate {
        chat_id: ChatId,
        last_message: Option<Message>,
        unread_counter: u32,
    },
    /// `chat:new`: メンバー個人へ
    ChatNew(Chat),
    /// `group:update`: メンバー個人とルームへ
    GroupUpdate(Chat),
    /// `group:removed`: 除名・退出したユーザーへ
    GroupRemoved { chat_id: ChatId },
    /// `user:status`: 全接続へ
    UserStatus {
        user_id: UserId,
        status: UserStatus,
        last_seen: Option<Timestamp>,
    },
    /// `typing:start`: 発信元以外のルーム接続へ
    TypingStart { chat_id: ChatId, user_id: UserId },
    /// `typing:stop`: 発信元以外のルーム接続へ
    TypingStop { chat_id: ChatId, user_id: UserId },
    /// `error`: 拒否したクライアントイベントの発信元接続へ
    Error { message: String },
}

impl ChatEvent {
    /// ワイヤ上のイベント名
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageNew(_) => "message:new",
            Self::MessageRead { .. } => "message:read",
            Self::ChatUpdate { .. } => "chat:update",
            Self::ChatNew(_) => "chat:new",
            Self::GroupUpdate(_) => "group:update",
            Self::GroupRemoved { .. } => "group:removed",
            Self::UserStatus { .. } => "user:status",
            Self::TypingStart { .. } => "typing:start",
            Self::TypingStop { .. } => "typing:stop",
            Self::Error { .. } => "error",
        }
    }
}
