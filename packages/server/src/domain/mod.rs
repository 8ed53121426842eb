//! ドメイン層
//!
//! Value Object・Entity・イベントと、ドメインが必要とする外部インターフェース
//! （Repository, ConnectionRegistry, MessagePusher, TokenVerifier）を定義する。

pub mod connection_registry;
pub mod entity;
pub mod error;
pub mod event;
pub mod message_pusher;
pub mod repository;
pub mod token_verifier;
pub mod value_object;

pub use connection_registry::{ConnectionRegistry, Departure, Registration};
pub use entity::{Chat, Connection, GROUP_MIN_OTHER_MEMBERS, Message, User, UserProfile};
pub use error::{
    AuthError, ChatError, MessagePushError, RegistryError, RepositoryError, ValueObjectError,
};
pub use event::ChatEvent;
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::{ChatRepository, MessageRepository, UserRepository};
pub use token_verifier::{Identity, TokenVerifier};
pub use value_object::{
    ChatId, ConnectionId, GroupName, MediaRef, MessageContent, MessageId, MessageKind, Timestamp,
    UserId, UserStatus,
};

#[cfg(test)]
pub use repository::{MockChatRepository, MockMessageRepository, MockUserRepository};
