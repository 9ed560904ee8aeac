//! Core type definitions for the Harvest client data layer.
//!
//! This crate defines the small, entity-agnostic types shared by the
//! normalizer, the store and the mutation controller:
//! - Entity identifiers (remote ids, or UUID v5 ids derived from payload content)
//! - Millisecond wall-clock timestamps with lenient parsing
//! - Per-(entity, field) generation tokens for optimistic mutations
//!
//! Domain entities (feed posts, profiles, notification preferences) live in
//! `harvest-model`, not here.

mod generation;
mod ids;
mod timestamp;

pub use generation::Generation;
pub use ids::EntityId;
pub use timestamp::Timestamp;

/// An untyped record as received from the remote service.
///
/// No field is guaranteed and field types may change between calls.
pub type RawRecord = serde_json::Value;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid entity id: {0:?}")]
    InvalidId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
