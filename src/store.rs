//! Backing store capability.
//!
//! The cache owns no state of its own; everything lives behind
//! [`TransientStore`]. Any key/value store with per-key get/set/delete can
//! back it. Stores with a native compare-and-swap should override [`swap`]
//! to make the ok-to-loading rewrite atomic.
//!
//! [`swap`]: TransientStore::swap

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Key/value persistence substrate for transient entries.
#[async_trait]
pub trait TransientStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write `value` under `key`. Returns `true` when the stored value
    /// changed; writing a value identical to the current one is a no-op and
    /// reports `false`.
    async fn set(&self, key: &str, value: Value) -> Result<bool, StoreError>;

    /// Returns `true` when an entry existed and was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Conditional write: store `next` only while the current value still
    /// equals `expected`. Returns `true` when the write happened.
    ///
    /// The default implementation is read-compare-write with no atomicity
    /// between the two steps, which leaves the duplicate-schedule race open
    /// and relies on scheduler-side dedup. Override with a real
    /// compare-and-swap where the store has one.
    async fn swap(&self, key: &str, expected: &Value, next: Value) -> Result<bool, StoreError> {
        match self.get(key).await? {
            Some(current) if current == *expected => self.set(key, next).await,
            _ => Ok(false),
        }
    }
}

/// In-memory store for tests, demos, and embedded use.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TransientStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<bool, StoreError> {
        let mut guard = self.entries.write().await;
        match guard.get(key) {
            Some(current) if *current == value => Ok(false),
            _ => {
                guard.insert(key.to_string(), value);
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    // Atomic: compare and write under a single write-lock scope.
    async fn swap(&self, key: &str, expected: &Value, next: Value) -> Result<bool, StoreError> {
        let mut guard = self.entries.write().await;
        match guard.get(key) {
            Some(current) if current == expected => {
                guard.insert(key.to_string(), next);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
