//! 接続時の ID トークン検証（外部コラボレータ）のインターフェース

use super::{AuthError, UserId, entity::UserProfile};

/// 検証済みトークンが示す利用者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub profile: UserProfile,
}

pub trait TokenVerifier: Send + Sync {
    /// トークンを検証し、認証済みの利用者を返す
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
