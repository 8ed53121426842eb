//! UseCase 層のエラー定義
//!
//! `NotFound` / `Forbidden` / `InvariantViolation` / `InvalidInput` は呼び出し元に返す
//! 終端エラーで、状態は一切変更されない。`TransientStoreFailure` は永続化
//! コラボレータが利用できない場合。

use thiserror::Error;

use crate::domain::{AuthError, ChatError, RegistryError, RepositoryError, ValueObjectError};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UseCaseError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvariantViolation(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("store unavailable: {0}")]
    TransientStoreFailure(String),
}

impl From<RepositoryError> for UseCaseError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::ChatNotFound(_)
            | RepositoryError::MessageNotFound(_)
            | RepositoryError::UserNotFound(_) => Self::NotFound(e.to_string()),
            RepositoryError::Unavailable(reason) => Self::TransientStoreFailure(reason),
        }
    }
}

impl From<ValueObjectError> for UseCaseError {
    fn from(e: ValueObjectError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl From<ChatError> for UseCaseError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::LastAdmin(_) => Self::InvariantViolation(e.to_string()),
            ChatError::NotAMember(_) => Self::NotFound(e.to_string()),
            ChatError::NotAGroup => Self::NotFound("group not found".to_string()),
            ChatError::AlreadyMember(_)
            | ChatError::AlreadyAdmin(_)
            | ChatError::NotEnoughMembers { .. }
            | ChatError::SelfChat
            | ChatError::IncompleteMessage { .. } => Self::InvalidInput(e.to_string()),
        }
    }
}

impl From<RegistryError> for UseCaseError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::ConnectionNotFound(_) => Self::NotFound(e.to_string()),
            RegistryError::DuplicateConnection(_) => Self::InvalidInput(e.to_string()),
        }
    }
}
