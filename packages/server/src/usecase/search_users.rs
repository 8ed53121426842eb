//! UseCase: ユーザー一覧の検索
//!
//! 1:1 会話やグループの相手を選ぶためのディレクトリ。一度でも接続したユーザーが対象で、
//! 呼び出し元自身は含まれない。

use std::sync::Arc;

use crate::domain::{User, UserId, UserRepository};

use super::UseCaseError;

pub struct SearchUsersUseCase {
    user_repository: Arc<dyn UserRepository>,
}

impl SearchUsersUseCase {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self { user_repository }
    }

    /// 空白だけのキーワードは指定なしとして扱う
    pub async fn execute(
        &self,
        requester: &UserId,
        keyword: Option<&str>,
    ) -> Result<Vec<User>, UseCaseError> {
        let keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        Ok(self.user_repository.search_users(keyword, requester).await?)
    }
}
