//! End-to-end soft transient behavior over the in-memory store and scheduler.
//!
//! Covers the full read/write/schedule lifecycle: plain writes, stale reads,
//! refresh scheduling and dedup, cancellation on delete, and the reset back
//! to `ok` when a refresh worker writes the entry again.

use std::sync::Arc;

use serde_json::{Value, json};
use soft_transients::{
    MemoryScheduler, MemoryStore, RefreshScheduler, SoftTransientCache, TransientStore,
};
use time::OffsetDateTime;

fn fixture() -> (Arc<MemoryStore>, Arc<MemoryScheduler>, SoftTransientCache) {
    let store = Arc::new(MemoryStore::new());
    let scheduler = Arc::new(MemoryScheduler::new());
    let cache = SoftTransientCache::with_defaults(store.clone(), scheduler.clone());
    (store, scheduler, cache)
}

/// Rewrite the stored envelope's expiry to one second in the past, the way a
/// backing store would look after the TTL elapsed.
async fn force_expire(store: &MemoryStore, key: &str) {
    let mut raw = store
        .get(key)
        .await
        .expect("store read")
        .expect("entry present");
    let map = raw.as_object_mut().expect("soft envelope");
    map.insert(
        "expiration".to_string(),
        json!(OffsetDateTime::now_utc().unix_timestamp() - 1),
    );
    store.set(key, raw).await.expect("store write");
}

#[tokio::test]
async fn the_basics() {
    let (_, _, cache) = fixture();

    assert_eq!(cache.get("doesnotexist").await.expect("get"), None);

    assert!(cache.set("key", json!("value"), 0, None).await.expect("set"));
    assert_eq!(cache.get("key").await.expect("get"), Some(json!("value")));

    // Identical re-set is a store-level no-op.
    assert!(!cache.set("key", json!("value"), 0, None).await.expect("re-set"));

    assert!(cache.set("key", json!("value2"), 0, None).await.expect("overwrite"));
    assert_eq!(cache.get("key").await.expect("get"), Some(json!("value2")));

    assert!(cache.delete("key", None).await.expect("delete"));
    assert_eq!(cache.get("key").await.expect("get"), None);
    assert!(!cache.delete("key", None).await.expect("second delete"));
}

#[tokio::test]
async fn structured_payloads_round_trip() {
    let (_, _, cache) = fixture();

    let value = json!({"foo": true, "bar": true});
    assert!(cache.set("key", value.clone(), 0, None).await.expect("set"));
    assert_eq!(cache.get("key").await.expect("get"), Some(value));

    let nested = json!({"items": [1, 2, 3], "meta": {"total": 3}});
    assert!(cache.set("key", nested.clone(), 60, None).await.expect("set"));
    assert_eq!(cache.get("key").await.expect("get"), Some(nested));
}

#[tokio::test]
async fn falsy_payload_survives_expiry() {
    let (store, _, cache) = fixture();

    cache.set("flag", json!(false), 100, None).await.expect("set");
    force_expire(&store, "flag").await;

    // Presence semantics: `false` is a payload, not a missing entry.
    assert_eq!(cache.get("flag").await.expect("get"), Some(json!(false)));
}

#[tokio::test]
async fn expiry_schedules_named_action() {
    let (store, scheduler, cache) = fixture();

    cache
        .set("key", json!("value"), 100, Some("test_soft_transient_1"))
        .await
        .expect("set");

    let stored: Value = store.get("key").await.expect("read").expect("entry");
    assert!(stored.get("expiration").and_then(Value::as_i64).unwrap_or(0) > 0);

    force_expire(&store, "key").await;

    assert_eq!(cache.get("key").await.expect("get"), Some(json!("value")));
    let when = scheduler
        .next_scheduled("test_soft_transient_1", "key")
        .await
        .expect("next")
        .expect("job pending");
    assert!(when <= OffsetDateTime::now_utc());
}

#[tokio::test]
async fn adding_a_timeout_to_a_plain_entry() {
    let (store, scheduler, cache) = fixture();

    cache.set("key", json!("value"), 0, None).await.expect("plain set");
    assert_eq!(cache.get("key").await.expect("get"), Some(json!("value")));

    // The second write must carry full soft-entry metadata.
    assert!(
        cache
            .set("key", json!("value2"), 1, Some("test_soft_transient_2"))
            .await
            .expect("soft set")
    );
    let stored = store.get("key").await.expect("read").expect("entry");
    assert!(stored.get("expiration").and_then(Value::as_i64).unwrap_or(0) > 0);

    force_expire(&store, "key").await;

    assert_eq!(cache.get("key").await.expect("get"), Some(json!("value2")));
    assert!(
        scheduler
            .next_scheduled("test_soft_transient_2", "key")
            .await
            .expect("next")
            .is_some()
    );
}

#[tokio::test]
async fn stale_reads_dedup_and_delete_cancels() {
    let (store, scheduler, cache) = fixture();

    cache.set("k", json!("A"), 100, None).await.expect("set");
    assert_eq!(cache.get("k").await.expect("get"), Some(json!("A")));
    assert_eq!(scheduler.pending_jobs().await, 0);

    force_expire(&store, "k").await;

    // Stale read serves the old value and schedules the default action.
    assert_eq!(cache.get("k").await.expect("get"), Some(json!("A")));
    assert!(
        scheduler
            .next_scheduled("transient_refresh_k", "k")
            .await
            .expect("next")
            .is_some()
    );

    // Reads before the job runs schedule nothing additional.
    assert_eq!(cache.get("k").await.expect("get"), Some(json!("A")));
    assert_eq!(scheduler.schedule_calls(), 1);

    // Delete removes the entry and cancels the job.
    assert!(cache.delete("k", None).await.expect("delete"));
    assert_eq!(scheduler.pending_jobs().await, 0);
    assert_eq!(cache.get("k").await.expect("get"), None);
}

#[tokio::test]
async fn refresh_completion_resets_the_state_machine() {
    let (store, scheduler, cache) = fixture();

    cache.set("k", json!("stale"), 100, None).await.expect("set");
    force_expire(&store, "k").await;
    assert_eq!(cache.get("k").await.expect("get"), Some(json!("stale")));

    // A worker claims the job and writes the recomputed value back.
    assert!(scheduler.claim("transient_refresh_k", "k").await.is_some());
    assert!(cache.set("k", json!("fresh"), 100, None).await.expect("refresh set"));

    assert_eq!(cache.get("k").await.expect("get"), Some(json!("fresh")));
    assert_eq!(scheduler.schedule_calls(), 1);

    // Status is back to ok, so the next expiry schedules again.
    force_expire(&store, "k").await;
    assert_eq!(cache.get("k").await.expect("get"), Some(json!("fresh")));
    assert_eq!(scheduler.schedule_calls(), 2);
}

#[tokio::test]
async fn custom_action_cancellation_is_exact() {
    let (store, scheduler, cache) = fixture();

    cache
        .set("k", json!("v"), 100, Some("my_action"))
        .await
        .expect("set");
    force_expire(&store, "k").await;
    cache.get("k").await.expect("get");

    // Deleting under the default action name leaves the custom job pending.
    assert!(cache.delete("k", None).await.expect("delete"));
    assert_eq!(scheduler.pending_jobs().await, 1);

    // Re-create and delete with the matching action.
    cache
        .set("k", json!("v"), 100, Some("my_action"))
        .await
        .expect("set");
    assert!(cache.delete("k", Some("my_action")).await.expect("delete"));
    assert_eq!(scheduler.pending_jobs().await, 0);
}

#[tokio::test]
async fn legacy_bare_values_read_back_verbatim() {
    let (store, scheduler, cache) = fixture();

    // A value written by earlier code with no envelope at all.
    store
        .set("legacy", json!({"count": 3}))
        .await
        .expect("seed");

    assert_eq!(
        cache.get("legacy").await.expect("get"),
        Some(json!({"count": 3}))
    );
    assert_eq!(scheduler.schedule_calls(), 0);
}
