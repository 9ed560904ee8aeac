//! Payload normalization.
//!
//! Remote records arrive in inconsistent shapes: the same author may be a
//! string on one call and a nested record on the next, counts may be numbers or
//! arrays, dates may be strings, epochs or `{seconds, nanoseconds}` records.
//! Each entity reads its fields through an ordered fallback chain that always
//! ends in a safe default, so the only input that fails to normalize is one
//! that is not a record at all.

use crate::FeedPost;
use harvest_types::RawRecord;
use serde_json::Value;
use tracing::debug;

/// Author name used when a payload carries none.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Author id used when a payload carries none.
pub const UNKNOWN_AUTHOR_ID: &str = "unknown";

/// Envelope keys that wrap a list of records in paged responses.
const ENVELOPE_KEYS: &[&str] = &["data", "items", "results", "posts", "records"];

/// Session context available while normalizing.
#[derive(Debug, Clone, Default)]
pub struct NormalizeContext {
    /// The signed-in user, used to detect likes in `likes: [...]` sequences.
    pub current_user_id: Option<String>,
}

impl NormalizeContext {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            current_user_id: Some(user_id.into()),
        }
    }
}

/// Conversion from an untyped remote record into a typed entity.
pub trait Normalize: Sized {
    /// Normalizes `raw`, returning `None` only when it is not a record.
    fn normalize_with(raw: &RawRecord, ctx: &NormalizeContext) -> Option<Self>;

    /// Normalizes `raw` without session context.
    fn normalize(raw: &RawRecord) -> Option<Self> {
        Self::normalize_with(raw, &NormalizeContext::default())
    }
}

/// Normalizes one feed record.
pub fn normalize(raw: &RawRecord) -> Option<FeedPost> {
    FeedPost::normalize(raw)
}

/// Normalizes a batch, silently dropping entries that are not records.
pub fn normalize_batch<E: Normalize>(raws: &[RawRecord], ctx: &NormalizeContext) -> Vec<E> {
    let entities: Vec<E> = raws
        .iter()
        .filter_map(|raw| E::normalize_with(raw, ctx))
        .collect();

    let dropped = raws.len() - entities.len();
    if dropped > 0 {
        debug!("Dropped {} of {} non-record entries from batch", dropped, raws.len());
    }
    entities
}

/// Flattens a fetch response into individual records.
///
/// The transport may answer with a single record, a sequence of records, or a
/// record wrapping the sequence under one of the usual envelope keys.
/// `null` yields nothing.
pub fn records_from_response(raw: RawRecord) -> Vec<RawRecord> {
    match raw {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        Value::Object(mut record) => {
            let envelope = ENVELOPE_KEYS
                .iter()
                .find(|key| record.get(**key).is_some_and(Value::is_array))
                .copied();
            match envelope.and_then(|key| record.remove(key)) {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(record)],
            }
        }
        other => vec![other],
    }
}
