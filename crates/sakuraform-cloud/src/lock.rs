//! Keyed mutual exclusion for shared parent resources
//!
//! Child resources of one parent (subnets of one Internet router) are
//! managed independently but mutate the parent's child list. Every
//! mutating call site takes the lock keyed by the parent id first.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Exclusive ownership of one key; released on drop
pub struct LockGuard {
    key: String,
    _held: Box<dyn Send + Sync>,
}

impl LockGuard {
    /// Wrap whatever keeps the key held. Dropping `held` must release it.
    pub fn new(key: impl Into<String>, held: impl Send + Sync + 'static) -> Self {
        Self {
            key: key.into(),
            _held: Box::new(held),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release explicitly instead of at end of scope
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        tracing::debug!("Released lock: {}", self.key);
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}

/// Lock registry injected into orchestrators
#[async_trait]
pub trait LockService: Send + Sync {
    /// Wait until the caller holds `key` exclusively
    async fn acquire(&self, key: &str) -> LockGuard;
}

/// In-process lock registry, one async mutex per key
///
/// Entries are created on first use and kept for the lifetime of the
/// registry; the key space is bounded by the parents a process touches.
#[derive(Debug, Default)]
pub struct NamedMutex {
    entries: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl NamedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key.to_string()).or_default().clone()
    }

    pub async fn lock(&self, key: &str) -> LockGuard {
        let mutex = self.entry(key);
        tracing::debug!("Acquiring lock: {}", key);
        let held = mutex.lock_owned().await;
        tracing::debug!("Acquired lock: {}", key);
        LockGuard::new(key, held)
    }

    /// Number of keys seen so far
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LockService for NamedMutex {
    async fn acquire(&self, key: &str) -> LockGuard {
        self.lock(key).await
    }
}

#[async_trait]
impl<T: LockService + ?Sized> LockService for Arc<T> {
    async fn acquire(&self, key: &str) -> LockGuard {
        (**self).acquire(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_same_key_blocks_until_release() {
        let locks = Arc::new(NamedMutex::new());
        let first = locks.acquire("internet-123").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let guard = locks.acquire("internet-123").await;
                guard.key().to_string()
            })
        };

        // still blocked while the first guard is alive
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!contender.is_finished());

        first.release();
        let key = tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("second acquire should proceed after release")
            .unwrap();
        assert_eq!(key, "internet-123");
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_keys_do_not_block() {
        let locks = NamedMutex::new();
        let _a = locks.acquire("internet-123").await;

        let b = tokio::time::timeout(Duration::from_secs(1), locks.acquire("internet-456")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_entries_are_reused() {
        let locks = NamedMutex::new();
        assert!(locks.is_empty());

        locks.acquire("internet-1").await.release();
        locks.acquire("internet-1").await.release();
        assert_eq!(locks.len(), 1);
    }
}
