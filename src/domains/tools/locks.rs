//! Per-identifier async mutual exclusion.
//!
//! Every operation that touches one tool's artifact or registry slot runs
//! under that tool's lock: startup loading, reloads, unloads and the
//! gateway's create/update/delete.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Lock table keyed by tool identifier.
///
/// Entries are dropped once nobody holds or waits for them. Cheap to clone:
/// clones share the same table.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Proof that the lock for [`key`](Self::key) is held.
///
/// Owned, so it can move into a spawned task.
pub struct KeyGuard {
    owner: KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let lock = self
            .locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        KeyGuard {
            owner: self.clone(),
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn held(&self) -> usize {
        self.locks.lock().len()
    }
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.owner.locks.lock();
        // Only the map holds the lock once every guard and waiter is gone.
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_released_after_use() {
        let locks = KeyedLocks::new();
        {
            let guard = locks.lock("calc").await;
            assert_eq!(guard.key(), "calc");
            assert_eq!(locks.held(), 1);
        }
        assert_eq!(locks.held(), 0);
    }

    #[tokio::test]
    async fn test_same_key_waits_for_holder() {
        let locks = KeyedLocks::new();
        let guard = locks.lock("calc").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("calc").await;
            })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(locks.held(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("a").await;
        let _b = locks.lock("b").await;
        assert_eq!(locks.held(), 2);
    }
}
