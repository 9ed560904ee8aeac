//! Field extraction helpers for untyped payloads.
//!
//! Every helper looks at a value, takes what it can use and reports `None`
//! otherwise. None of them panic or allocate for rejected values.

use harvest_types::Timestamp;
use serde_json::{Map, Value};

pub(crate) type Record = Map<String, Value>;

/// A non-blank string, trimmed.
pub(crate) fn text(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// First key holding a non-blank string.
pub(crate) fn first_text(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(text))
        .map(str::to_string)
}

/// First key holding a non-blank string inside the nested record `parent`.
pub(crate) fn nested_text(record: &Record, parent: &str, keys: &[&str]) -> Option<String> {
    record
        .get(parent)
        .and_then(Value::as_object)
        .and_then(|nested| first_text(nested, keys))
}

/// An identifier: a non-blank string, or an integer rendered in decimal.
pub(crate) fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => text(value).map(str::to_string),
        Value::Number(n) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| n.as_i64().map(|v| v.to_string()))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| format!("{f:.0}"))
            }),
        // Extended-JSON object ids.
        Value::Object(record) => record.get("$oid").and_then(id_value),
        _ => None,
    }
}

/// First key holding an identifier.
pub(crate) fn first_id(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| record.get(*key).and_then(id_value))
}

/// First key holding an identifier inside the nested record `parent`.
pub(crate) fn nested_id(record: &Record, parent: &str, keys: &[&str]) -> Option<String> {
    record
        .get(parent)
        .and_then(Value::as_object)
        .and_then(|nested| first_id(nested, keys))
}

/// A count: numbers are taken as-is (clamped at zero, truncated), sequences
/// count their elements. Anything else is not a count.
pub(crate) fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => Some(
            n.as_u64()
                .or_else(|| n.as_i64().map(|_| 0))
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite())
                        .map(|f| if f <= 0.0 { 0 } else { f.trunc() as u64 })
                })
                .unwrap_or(0),
        ),
        Value::Array(items) => Some(items.len() as u64),
        _ => None,
    }
}

/// First key holding a count, or zero.
pub(crate) fn first_count(record: &Record, keys: &[&str]) -> u64 {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(count))
        .unwrap_or(0)
}

/// A boolean flag. Accepts booleans, numbers (non-zero is true) and the usual
/// textual spellings.
pub(crate) fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" | "enabled" => Some(true),
            "false" | "off" | "no" | "0" | "disabled" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// First key holding a flag.
pub(crate) fn first_flag(record: &Record, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| record.get(*key).and_then(flag))
}

/// A point in time.
///
/// Strings and numbers go through [`Timestamp`] parsing. Records are read as
/// `{seconds, nanoseconds}` pairs (with or without leading underscores) or as
/// extended-JSON `{"$date": ...}` wrappers.
pub(crate) fn timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(s) => Timestamp::parse_str(s).ok(),
        Value::Number(n) => n.as_f64().and_then(|f| Timestamp::from_epoch(f).ok()),
        Value::Object(record) => {
            if let Some(inner) = record.get("$date") {
                return timestamp(inner);
            }
            if let Some(inner) = record.get("$numberLong") {
                return timestamp(inner);
            }
            let seconds = ["seconds", "_seconds"]
                .iter()
                .find_map(|key| record.get(*key).and_then(Value::as_f64))?;
            let nanos = ["nanoseconds", "_nanoseconds"]
                .iter()
                .find_map(|key| record.get(*key).and_then(Value::as_f64))
                .unwrap_or(0.0);
            Timestamp::from_seconds_nanos(seconds, nanos).ok()
        }
        _ => None,
    }
}

/// First key holding a parseable time, or the current time.
pub(crate) fn first_timestamp(record: &Record, keys: &[&str]) -> Timestamp {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(timestamp))
        .unwrap_or_else(Timestamp::now)
}

/// Raw text of the first present key, for deriving content ids.
pub(crate) fn first_raw(record: &Record, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| record.get(*key))
        .map(Value::to_string)
        .unwrap_or_default()
}

/// Whether `id` appears in a sequence of user references.
///
/// Elements may be plain ids or records carrying `id`, `_id`, `userId` or `uid`.
pub(crate) fn contains_user(value: &Value, id: &str) -> bool {
    let Some(items) = value.as_array() else {
        return false;
    };
    items.iter().any(|item| match item {
        Value::Object(record) => {
            first_id(record, &["id", "_id", "userId", "uid"]).as_deref() == Some(id)
        }
        other => id_value(other).as_deref() == Some(id),
    })
}
