//! キー単位の非同期ロック
//!
//! 同じキーに対する処理を直列化し、異なるキーの処理は並行に進める。
//! 会話ごとの単一書き込み（Chat 単位の直列化）やユーザーごとのプレゼンス遷移に使う。
//! 使われていないキーのエントリは、最後のガードまたは待機中の `lock` が破棄された時点で削除される。

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::ChatId;

/// 会話ごとの書き込みロック
pub type ChatLocks = KeyedLocks<ChatId>;

pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

/// キーごとのロックと、それを取得中・保持中のリース数
#[derive(Default)]
struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    leases: usize,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// `key` のロックを取得する。ガードが破棄されるまで同じキーの `lock` は待機する
    ///
    /// 待機中に future が破棄された場合もエントリは残らない。
    pub async fn lock(&self, key: &K) -> KeyedGuard<'_, K> {
        let (lease, mutex) = Lease::acquire(self, key);
        let guard = mutex.lock_owned().await;
        KeyedGuard {
            _guard: guard,
            _lease: lease,
        }
    }

    /// 保持しているキーの数
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &K) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(key) {
            slot.leases = slot.leases.saturating_sub(1);
            if slot.leases == 0 {
                slots.remove(key);
            }
        }
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// キーのエントリを参照している間（待機中も含む）のリース
struct Lease<'a, K: Eq + Hash + Clone> {
    locks: &'a KeyedLocks<K>,
    key: K,
}

impl<'a, K: Eq + Hash + Clone> Lease<'a, K> {
    fn acquire(locks: &'a KeyedLocks<K>, key: &K) -> (Self, Arc<AsyncMutex<()>>) {
        let mutex = {
            let mut slots = locks.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = slots.entry(key.clone()).or_default();
            slot.leases += 1;
            slot.mutex.clone()
        };
        let lease = Self {
            locks,
            key: key.clone(),
        };
        (lease, mutex)
    }
}

impl<K: Eq + Hash + Clone> Drop for Lease<'_, K> {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}

/// `KeyedLocks::lock` のガード
///
/// フィールドは宣言順に破棄される。ロックを解放してからリースを返す。
pub struct KeyedGuard<'a, K: Eq + Hash + Clone> {
    _guard: OwnedMutexGuard<()>,
    _lease: Lease<'a, K>,
}
