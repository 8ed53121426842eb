//! UseCase 層
//!
//! ドメインの trait（Repository, ConnectionRegistry, MessagePusher）だけに依存し、
//! 配信レイヤーの各操作を実装する。

pub mod access_chat;
pub mod broadcaster;
pub mod connect_user;
pub mod disconnect_user;
pub mod error;
pub mod get_messages;
pub mod keyed_lock;
pub mod manage_group;
pub mod mark_as_read;
pub mod notifier;
pub mod presence_tracker;
pub mod room_subscription;
pub mod search_users;
pub mod send_message;
pub mod typing;

#[cfg(test)]
pub(crate) mod test_support;

pub use access_chat::{AccessChatUseCase, AccessedChat};
pub use broadcaster::EventBroadcaster;
pub use connect_user::ConnectUserUseCase;
pub use disconnect_user::DisconnectUserUseCase;
pub use error::UseCaseError;
pub use get_messages::GetMessagesUseCase;
pub use keyed_lock::{ChatLocks, KeyedLocks};
pub use manage_group::ManageGroupUseCase;
pub use mark_as_read::MarkAsReadUseCase;
pub use notifier::{ChatNotice, ChatNotifier};
pub use presence_tracker::PresenceTracker;
pub use room_subscription::RoomSubscriptionUseCase;
pub use search_users::SearchUsersUseCase;
pub use send_message::{SendMessageCommand, SendMessageUseCase};
pub use typing::TypingUseCase;
