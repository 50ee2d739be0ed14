//! Soft transients: stale-while-revalidate caching.
//!
//! A soft transient keeps serving its cached value after the TTL passes while
//! a refresh runs out-of-band, so the read path never pays for
//! recomputation. On the first expired read the cache schedules the entry's
//! refresh action (a named job with the key as its argument) and marks the
//! entry `loading`; further reads keep returning the stale payload without
//! scheduling anything until a fresh write resets the entry.
//!
//! The cache owns no state and no execution: storage sits behind the
//! [`TransientStore`] trait, deferred work behind [`RefreshScheduler`].
//! In-memory implementations of both ship for tests and embedded use.
//!
//! ```ignore
//! let store = Arc::new(MemoryStore::new());
//! let scheduler = Arc::new(MemoryScheduler::new());
//! let cache = SoftTransientCache::with_defaults(store, scheduler);
//!
//! cache.set("stats", json!({"views": 10}), 300, None).await?;
//! let value = cache.get("stats").await?; // served instantly, stale or not
//! ```
//!
//! Values stored without a TTL stay plain: no envelope, no scheduling, and
//! any bare value written by earlier code decodes unchanged.

mod cache;
mod config;
mod entry;
mod scheduler;
mod store;

pub use cache::{CacheError, SoftTransientCache};
pub use config::CacheConfig;
pub use entry::{Decoded, RefreshStatus, SoftEntry, decode, encode};
pub use scheduler::{MemoryScheduler, RefreshScheduler, SchedulerError};
pub use store::{MemoryStore, StoreError, TransientStore};
