//! InMemory User Repository 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, User, UserId, UserRepository};

/// インメモリ User Repository 実装
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_user(&self, user_id: &UserId) -> Result<User, RepositoryError> {
        let users = self.users.lock().await;
        users
            .get(user_id)
            .cloned()
            .ok_or_else(|| RepositoryError::UserNotFound(user_id.clone()))
    }

    async fn save_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().await;
        users.insert(user.id().clone(), user);
        Ok(())
    }

    async fn search_users(
        &self,
        keyword: Option<String>,
        exclude: &UserId,
    ) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.lock().await;
        let mut found: Vec<User> = users
            .values()
            .filter(|user| user.id() != exclude)
            .filter(|user| keyword.as_deref().is_none_or(|k| user.matches(k)))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(found)
    }
}
