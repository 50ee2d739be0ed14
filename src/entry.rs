//! Soft entry envelope codec.
//!
//! A stored value is either a plain cached value, returned verbatim, or a
//! soft entry: the payload wrapped with an absolute expiry and a refresh
//! status. Classification uses presence-of-field semantics so a payload of
//! `false`, `0` or `""` still counts as a soft entry. Bare values written
//! before a TTL was ever attached keep decoding as plain values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Refresh state of a soft entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    /// No refresh outstanding; an expired read may schedule one.
    Ok,
    /// A refresh has been scheduled and not yet confirmed complete. Reset to
    /// `Ok` only by a full rewrite of the entry.
    Loading,
}

impl RefreshStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshStatus::Ok => "ok",
            RefreshStatus::Loading => "loading",
        }
    }
}

/// A cached value wrapped with expiration and refresh metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftEntry {
    /// Absolute expiry as unix seconds. Non-zero once stored; durations are
    /// resolved to an absolute instant at write time.
    pub expiration: i64,
    /// The cached payload, opaque to the cache.
    pub data: Value,
    pub status: RefreshStatus,
    /// Scheduler action to fire on expiry. `None` means the default action
    /// derived from the key.
    pub action: Option<String>,
}

impl SoftEntry {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expiration <= now.unix_timestamp()
    }

    /// The stored envelope shape for this entry.
    pub fn into_value(self) -> Value {
        let mut map = Map::with_capacity(4);
        map.insert("expiration".to_string(), Value::from(self.expiration));
        map.insert("data".to_string(), self.data);
        map.insert("status".to_string(), Value::from(self.status.as_str()));
        map.insert(
            "action".to_string(),
            self.action.map(Value::from).unwrap_or(Value::Null),
        );
        Value::Object(map)
    }
}

/// Result of classifying a raw stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Not an envelope; the raw value is the effective payload.
    Plain(Value),
    Soft(SoftEntry),
}

/// Encode a write as either a plain value or a soft entry envelope.
///
/// `ttl_seconds == 0` returns the payload unwrapped: a plain write with no
/// expiration metadata and no scheduling semantics. An empty action name is
/// normalized to "use the default derived from the key".
pub fn encode(
    now: OffsetDateTime,
    ttl_seconds: u64,
    payload: Value,
    action: Option<String>,
) -> Value {
    if ttl_seconds == 0 {
        return payload;
    }
    SoftEntry {
        expiration: now.unix_timestamp() + ttl_seconds as i64,
        data: payload,
        status: RefreshStatus::Ok,
        action: action.filter(|name| !name.is_empty()),
    }
    .into_value()
}

/// Classify a raw stored value as a soft entry or a plain value.
///
/// Soft iff the value is an object carrying a non-zero integer `expiration`
/// and a present `data` key. Any `status` other than a literal `"ok"` decodes
/// as [`RefreshStatus::Loading`], which suppresses scheduling.
pub fn decode(raw: Value) -> Decoded {
    match raw {
        Value::Object(mut map) if is_soft_shape(&map) => {
            let expiration = map
                .get("expiration")
                .and_then(Value::as_i64)
                .unwrap_or_default();
            let data = map.remove("data").unwrap_or(Value::Null);
            let status = match map.get("status").and_then(Value::as_str) {
                Some("ok") => RefreshStatus::Ok,
                _ => RefreshStatus::Loading,
            };
            let action = match map.remove("action") {
                Some(Value::String(name)) if !name.is_empty() => Some(name),
                _ => None,
            };
            Decoded::Soft(SoftEntry {
                expiration,
                data,
                status,
                action,
            })
        }
        other => Decoded::Plain(other),
    }
}

fn is_soft_shape(map: &Map<String, Value>) -> bool {
    map.get("expiration")
        .and_then(Value::as_i64)
        .is_some_and(|ts| ts != 0)
        && map.contains_key("data")
}
