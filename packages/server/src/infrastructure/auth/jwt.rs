//! HS256 JWT を使った TokenVerifier 実装
//!
//! トークンの発行は認証サービスの責務であり、このサーバーは検証のみを行う。
//! `sub` クレームがユーザー ID になり、任意の `name` / `email` クレームがプロフィールになる。

use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, Identity, TokenVerifier, UserId, UserProfile};

/// ID トークンのクレーム
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// ユーザー ID
    pub sub: String,
    /// 有効期限（Unix 秒）
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// 共有シークレットで HS256 トークンを検証する
pub struct JwtTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
        }
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let token_data =
            decode::<Claims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let Claims {
            sub, name, email, ..
        } = token_data.claims;
        let user_id = UserId::new(sub).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(Identity {
            user_id,
            profile: UserProfile { name, email },
        })
    }
}
