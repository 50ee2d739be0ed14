//! Deferred refresh scheduling capability.
//!
//! The cache never executes a refresh itself; it hands the work to a
//! [`RefreshScheduler`] as a named action with the cache key as its argument
//! and keeps serving the stale value meanwhile.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler backend error: {0}")]
    Backend(String),
}

impl SchedulerError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Runs named actions once, at or after a given time.
///
/// Implementations must be idempotent per `(action, key)` pair: scheduling
/// while a prior run of the same pair is still pending must not create a
/// second pending job. The cache leans on this to bound duplicate refreshes
/// when two readers race on the same expired entry.
#[async_trait]
pub trait RefreshScheduler: Send + Sync {
    async fn schedule_once(
        &self,
        when: OffsetDateTime,
        action: &str,
        key: &str,
    ) -> Result<(), SchedulerError>;

    /// Earliest pending run of `(action, key)`, if any.
    async fn next_scheduled(
        &self,
        action: &str,
        key: &str,
    ) -> Result<Option<OffsetDateTime>, SchedulerError>;

    /// Cancel the pending run registered at `when`. Cancelling a job that is
    /// not pending is a no-op; a refresh already executing is unaffected.
    async fn unschedule(
        &self,
        when: OffsetDateTime,
        action: &str,
        key: &str,
    ) -> Result<(), SchedulerError>;
}

/// In-memory scheduler for tests, demos, and embedded use.
///
/// Keeps at most one pending run per `(action, key)` pair, preferring the
/// earlier timestamp, and counts every `schedule_once` call so tests can
/// assert on scheduling traffic.
#[derive(Default)]
pub struct MemoryScheduler {
    pending: RwLock<HashMap<(String, String), OffsetDateTime>>,
    schedule_calls: AtomicUsize,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `schedule_once` invocations, deduplicated or not.
    pub fn schedule_calls(&self) -> usize {
        self.schedule_calls.load(Ordering::Relaxed)
    }

    /// Number of distinct pending jobs.
    pub async fn pending_jobs(&self) -> usize {
        self.pending.read().await.len()
    }

    /// Remove and return a pending job, the way a worker claims it to run.
    pub async fn claim(&self, action: &str, key: &str) -> Option<OffsetDateTime> {
        self.pending
            .write()
            .await
            .remove(&(action.to_string(), key.to_string()))
    }
}

#[async_trait]
impl RefreshScheduler for MemoryScheduler {
    async fn schedule_once(
        &self,
        when: OffsetDateTime,
        action: &str,
        key: &str,
    ) -> Result<(), SchedulerError> {
        self.schedule_calls.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.pending.write().await;
        let slot = guard
            .entry((action.to_string(), key.to_string()))
            .or_insert(when);
        if when < *slot {
            *slot = when;
        }
        Ok(())
    }

    async fn next_scheduled(
        &self,
        action: &str,
        key: &str,
    ) -> Result<Option<OffsetDateTime>, SchedulerError> {
        Ok(self
            .pending
            .read()
            .await
            .get(&(action.to_string(), key.to_string()))
            .copied())
    }

    async fn unschedule(
        &self,
        when: OffsetDateTime,
        action: &str,
        key: &str,
    ) -> Result<(), SchedulerError> {
        let mut guard = self.pending.write().await;
        let slot = (action.to_string(), key.to_string());
        if guard.get(&slot).is_some_and(|pending| *pending == when) {
            guard.remove(&slot);
        }
        Ok(())
    }
}
