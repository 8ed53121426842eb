//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## 原子性
//!
//! `ChatRepository::record_message` と `ChatRepository::reset_unread_counter` は
//! 1 つの Chat に対する原子的な更新でなければならない。カウンタマップ全体を
//! 読んで書き戻す実装は、同一 Chat への同時送信で更新を失うため不可。

use async_trait::async_trait;

use super::{
    ChatId, MessageId, RepositoryError, Timestamp, UserId,
    entity::{Chat, Message, User},
};

/// Chat Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Chat を取得
    async fn get_chat(&self, chat_id: ChatId) -> Result<Chat, RepositoryError>;

    /// Chat を保存（新規作成・メンバー変更）
    async fn save_chat(&self, chat: Chat) -> Result<(), RepositoryError>;

    /// 2 人の間の 1:1 会話を検索
    async fn find_direct_chat(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Chat>, RepositoryError>;

    /// ユーザーが参加している会話一覧（更新日時の新しい順）
    async fn list_chats_of(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError>;

    /// 新着メッセージを原子的に記録
    ///
    /// `unread_members` のカウンタを 1 ずつ増やし、`last_message` を更新する。
    /// 更新後の Chat を返す。
    async fn record_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        unread_members: Vec<UserId>,
        at: Timestamp,
    ) -> Result<Chat, RepositoryError>;

    /// 未読カウンタを原子的に 0 に戻す。更新後の Chat を返す
    async fn reset_unread_counter(
        &self,
        chat_id: ChatId,
        user_id: &UserId,
    ) -> Result<Chat, RepositoryError>;
}

/// Message Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを保存
    async fn create_message(&self, message: Message) -> Result<(), RepositoryError>;

    /// メッセージを削除（送信失敗時の補償処理）
    async fn delete_message(&self, message_id: MessageId) -> Result<(), RepositoryError>;

    /// メッセージを取得
    async fn get_message(&self, message_id: MessageId) -> Result<Message, RepositoryError>;

    /// 会話のメッセージ一覧（古い順）
    async fn list_messages(&self, chat_id: ChatId) -> Result<Vec<Message>, RepositoryError>;

    /// 会話内で `user_id` が未読のメッセージ全てに既読を付ける
    ///
    /// 既読済みのメッセージは変更しない。新たに既読になった件数を返す。
    async fn mark_chat_read_by(
        &self,
        chat_id: ChatId,
        user_id: &UserId,
    ) -> Result<usize, RepositoryError>;
}

/// User Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// User を取得
    async fn get_user(&self, user_id: &UserId) -> Result<User, RepositoryError>;

    /// User を保存
    async fn save_user(&self, user: User) -> Result<(), RepositoryError>;

    /// `exclude` 以外のユーザーを ID 順で返す。`keyword` があれば ID・名前・メールアドレスで絞り込む
    async fn search_users(
        &self,
        keyword: Option<String>,
        exclude: &UserId,
    ) -> Result<Vec<User>, RepositoryError>;
}
