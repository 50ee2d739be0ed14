//! Cache configuration.
//!
//! Controls default refresh-action naming and whether expired reads schedule
//! a refresh at all.

use serde::Deserialize;

const DEFAULT_ACTION_PREFIX: &str = "transient_refresh_";

/// Configuration for [`SoftTransientCache`](crate::SoftTransientCache).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix for the default refresh action derived from a key.
    pub action_prefix: String,
    /// When false, expired entries are served stale without ever scheduling
    /// a refresh.
    pub schedule_on_expiry: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            action_prefix: DEFAULT_ACTION_PREFIX.to_string(),
            schedule_on_expiry: true,
        }
    }
}

impl CacheConfig {
    /// Default scheduler action for `key`, used when neither the stored entry
    /// nor the caller names one. A pure function of the key: get, set, and
    /// delete must all resolve the same name for scheduling and cancellation
    /// to line up.
    pub fn default_action(&self, key: &str) -> String {
        format!("{}{}", self.action_prefix, key)
    }
}
