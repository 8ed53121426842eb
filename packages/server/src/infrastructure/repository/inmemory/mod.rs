//! InMemory Repository 実装
//!
//! ドキュメントストアの代わりに HashMap をインメモリ DB として使用します。
//! 各 Repository は 1 つの `Mutex` でデータを守るため、1 回の呼び出しは原子的です。

mod chat;
mod message;
mod user;

pub use chat::InMemoryChatRepository;
pub use message::InMemoryMessageRepository;
pub use user::InMemoryUserRepository;
