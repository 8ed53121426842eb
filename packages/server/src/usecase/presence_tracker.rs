//! UseCase: プレゼンス（online / offline）の追跡
//!
//! ## 何をしているか
//! - ユーザーの接続数が 0 ↔ 1 の境界を越えたときだけ状態を遷移させる
//! - 遷移は永続化に成功してから `user:status` を全接続へ通知する
//!
//! ## 境界の判定
//! Registry の接続登録・解除の結果（最初の接続 / 最後の接続）を契機に `reconcile` を呼ぶ。
//! `reconcile` はユーザー単位のロックの中で Registry の現在の接続数を読み直し、
//! 最後に通知した状態と比べて異なる場合だけ遷移する。接続と切断が競合しても
//! 通知は実際の境界 1 回につき 1 回で、最後に確定するのは Registry と一致する状態になる。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use kidoku_shared::time::Clock;

use crate::domain::{
    ChatEvent, ConnectionRegistry, RepositoryError, Timestamp, User, UserId, UserProfile,
    UserRepository, UserStatus,
};

use super::{UseCaseError, broadcaster::EventBroadcaster, keyed_lock::KeyedLocks};

pub struct PresenceTracker {
    user_repository: Arc<dyn UserRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    broadcaster: EventBroadcaster,
    clock: Arc<dyn Clock>,
    user_locks: KeyedLocks<UserId>,
    /// 最後に通知した状態（エントリなしは offline）
    announced: Mutex<HashMap<UserId, UserStatus>>,
}

impl PresenceTracker {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        broadcaster: EventBroadcaster,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repository,
            registry,
            broadcaster,
            clock,
            user_locks: KeyedLocks::new(),
            announced: Mutex::new(HashMap::new()),
        }
    }

    /// Registry の状態にプレゼンスを合わせる
    ///
    /// # Returns
    ///
    /// * `Ok(Some(status))` - 遷移して通知した
    /// * `Ok(None)` - 既に一致していた
    /// * `Err(UseCaseError)` - 永続化に失敗（通知していない）
    pub async fn reconcile(&self, user_id: &UserId) -> Result<Option<UserStatus>, UseCaseError> {
        let _guard = self.user_locks.lock(user_id).await;

        let actual = if self.registry.connections_of(user_id).await.is_empty() {
            UserStatus::Offline
        } else {
            UserStatus::Online
        };
        if self.last_announced(user_id) == actual {
            return Ok(None);
        }

        let mut user = self.load_or_new(user_id).await?;
        match actual {
            UserStatus::Online => user.go_online(),
            UserStatus::Offline => user.go_offline(Timestamp::new(self.clock.now_millis())),
        }
        let last_seen = user.last_seen();
        self.user_repository.save_user(user).await?;
        self.remember(user_id, actual);

        tracing::info!("User '{}' is now {}", user_id, actual.as_str());
        let event = ChatEvent::UserStatus {
            user_id: user_id.clone(),
            status: actual,
            last_seen,
        };
        self.broadcaster.to_everyone(&event).await;

        Ok(Some(actual))
    }

    /// 接続時のプロフィールを保存する（ユーザー一覧の検索対象になる）
    pub async fn remember_profile(
        &self,
        user_id: &UserId,
        profile: UserProfile,
    ) -> Result<(), UseCaseError> {
        let _guard = self.user_locks.lock(user_id).await;

        let mut user = self.load_or_new(user_id).await?;
        user.update_profile(profile);
        self.user_repository.save_user(user).await?;
        Ok(())
    }

    async fn load_or_new(&self, user_id: &UserId) -> Result<User, UseCaseError> {
        match self.user_repository.get_user(user_id).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::UserNotFound(_)) => Ok(User::new(user_id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn last_announced(&self, user_id: &UserId) -> UserStatus {
        self.announced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .copied()
            .unwrap_or_default()
    }

    fn remember(&self, user_id: &UserId, status: UserStatus) {
        let mut announced = self.announced.lock().unwrap_or_else(PoisonError::into_inner);
        match status {
            UserStatus::Online => {
                announced.insert(user_id.clone(), status);
            }
            UserStatus::Offline => {
                announced.remove(user_id);
            }
        }
    }
}
