//! The soft transient cache.
//!
//! Serves the last-known value immediately, even past its TTL, and asks the
//! scheduler to refresh it out-of-band so no reader ever pays for
//! recomputation. The cache itself is stateless: everything lives in the
//! injected store, and the only caller-visible transition is marking an
//! expired entry `loading` so concurrent readers converge on a single
//! outstanding refresh.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::entry::{Decoded, RefreshStatus, SoftEntry, decode, encode};
use crate::scheduler::RefreshScheduler;
use crate::store::{StoreError, TransientStore};

/// Failure on the primary read/write path.
///
/// Refresh bookkeeping (scheduling, cancellation, the loading rewrite) is
/// best-effort and never surfaces here; it is logged and swallowed so the
/// cached value stays available.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stale-while-revalidate cache over an injected store and scheduler.
pub struct SoftTransientCache {
    config: CacheConfig,
    store: Arc<dyn TransientStore>,
    scheduler: Arc<dyn RefreshScheduler>,
}

impl SoftTransientCache {
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn TransientStore>,
        scheduler: Arc<dyn RefreshScheduler>,
    ) -> Self {
        Self {
            config,
            store,
            scheduler,
        }
    }

    pub fn with_defaults(
        store: Arc<dyn TransientStore>,
        scheduler: Arc<dyn RefreshScheduler>,
    ) -> Self {
        Self::new(CacheConfig::default(), store, scheduler)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Read the effective payload for `key`.
    ///
    /// Plain values come back verbatim. A soft entry returns its payload
    /// whether expired or not; on the first expired read with no refresh
    /// outstanding, the configured action is scheduled for "now" and the
    /// entry is marked `loading`. Never blocks on the refresh.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };

        let entry = match decode(raw) {
            Decoded::Plain(value) => return Ok(Some(value)),
            Decoded::Soft(entry) => entry,
        };

        let now = OffsetDateTime::now_utc();
        if entry.is_expired(now) && entry.status == RefreshStatus::Ok {
            if self.config.schedule_on_expiry {
                self.begin_refresh(key, &entry, now).await;
            } else {
                debug!(key, "expired entry served stale: scheduling disabled");
            }
        }

        Ok(Some(entry.data))
    }

    /// Write `value` under `key`.
    ///
    /// `ttl_seconds == 0` is a plain write: no expiration metadata, no
    /// scheduling semantics until a later set supplies a TTL. Otherwise the
    /// value is stored as a soft entry with status `ok`, which also clears
    /// any `loading` mark left by a prior expired read. Returns the store's
    /// changed flag; rewriting an identical value reports `false`.
    pub async fn set(
        &self,
        key: &str,
        value: Value,
        ttl_seconds: u64,
        action: Option<&str>,
    ) -> Result<bool, CacheError> {
        let raw = encode(
            OffsetDateTime::now_utc(),
            ttl_seconds,
            value,
            action.map(str::to_owned),
        );
        Ok(self.store.set(key, raw).await?)
    }

    /// Remove `key` and cancel its pending refresh, if one is scheduled.
    ///
    /// The action resolves exactly as on the read path: the explicit argument
    /// if given, else the default derived from the key. An entry stored with
    /// a custom action is therefore only cancelled when the same action is
    /// passed here. Deleting a missing key returns `Ok(false)`.
    pub async fn delete(&self, key: &str, action: Option<&str>) -> Result<bool, CacheError> {
        let action = match action.filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => self.config.default_action(key),
        };

        match self.scheduler.next_scheduled(&action, key).await {
            Ok(Some(when)) => {
                if let Err(error) = self.scheduler.unschedule(when, &action, key).await {
                    warn!(key, action = %action, error = %error, "failed to cancel pending refresh");
                }
            }
            Ok(None) => {}
            Err(error) => {
                warn!(key, action = %action, error = %error, "failed to query pending refresh");
            }
        }

        Ok(self.store.delete(key).await?)
    }

    /// Schedule the refresh action and mark the entry `loading`.
    ///
    /// Fire-and-forget: every failure is logged and swallowed so the read
    /// path keeps returning the stale payload. When scheduling fails the
    /// loading rewrite is skipped, leaving status `ok` so a later read
    /// retries. The rewrite is conditional on the entry being unchanged
    /// since it was read; a concurrent write wins and the mark is dropped.
    async fn begin_refresh(&self, key: &str, entry: &SoftEntry, now: OffsetDateTime) {
        let action = entry
            .action
            .clone()
            .unwrap_or_else(|| self.config.default_action(key));

        if let Err(error) = self.scheduler.schedule_once(now, &action, key).await {
            warn!(key, action = %action, error = %error, "failed to schedule refresh");
            return;
        }

        let previous = entry.clone().into_value();
        let marked = SoftEntry {
            status: RefreshStatus::Loading,
            ..entry.clone()
        };
        match self.store.swap(key, &previous, marked.into_value()).await {
            Ok(true) => {
                debug!(key, action = %action, "refresh scheduled, entry marked loading");
            }
            Ok(false) => {
                debug!(key, action = %action, "entry changed concurrently, loading mark skipped");
            }
            Err(error) => {
                warn!(key, action = %action, error = %error, "failed to mark entry loading");
            }
        }
    }
}
