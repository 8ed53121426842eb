//! ドメイン層のエラー定義

use thiserror::Error;

use super::value_object::{ChatId, ConnectionId, MessageId, UserId};

/// Value Object 生成時のバリデーションエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    UserIdEmpty,

    #[error("user id is too long ({0} bytes)")]
    UserIdTooLong(usize),

    #[error("user id '{0}' must not contain whitespace")]
    UserIdInvalid(String),

    #[error("'{0}' is not a valid id")]
    InvalidId(String),

    #[error("message content must not be empty")]
    MessageContentEmpty,

    #[error("message content is too long ({0} characters)")]
    MessageContentTooLong(usize),

    #[error("media reference must not be empty")]
    MediaRefEmpty,

    #[error("group name must not be empty")]
    GroupNameEmpty,

    #[error("group name is too long ({0} characters)")]
    GroupNameTooLong(usize),

    #[error("unknown message type '{0}'")]
    UnknownMessageKind(String),
}

/// Chat / Message エンティティの不変条件違反
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("user '{0}' is not a member of this chat")]
    NotAMember(UserId),

    #[error("user '{0}' is already a member of this chat")]
    AlreadyMember(UserId),

    #[error("user '{0}' is already an admin of this chat")]
    AlreadyAdmin(UserId),

    #[error("user '{0}' is the last admin; assign another admin first")]
    LastAdmin(UserId),

    #[error("chat is not a group")]
    NotAGroup,

    #[error("a group needs at least {required} other members, got {actual}")]
    NotEnoughMembers { required: usize, actual: usize },

    #[error("a direct chat needs two distinct members")]
    SelfChat,

    #[error("a {kind} message requires {missing}")]
    IncompleteMessage {
        kind: &'static str,
        missing: &'static str,
    },
}

/// Repository（永続化コラボレータ）のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("chat '{0}' not found")]
    ChatNotFound(ChatId),

    #[error("message '{0}' not found")]
    MessageNotFound(MessageId),

    #[error("user '{0}' not found")]
    UserNotFound(UserId),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Connection Registry のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("connection '{0}' is already registered")]
    DuplicateConnection(ConnectionId),

    #[error("connection '{0}' not found")]
    ConnectionNotFound(ConnectionId),
}

/// MessagePusher のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),

    #[error("failed to serialize event: {0}")]
    Serialization(String),
}

/// ハンドシェイク時の認証エラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("identity token is missing")]
    MissingToken,

    #[error("identity token is invalid: {0}")]
    InvalidToken(String),

    #[error("identity token has expired")]
    Expired,
}
