//! Error types for the model layer.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when writing typed values into an entity.
///
/// Normalization itself never errors; malformed payloads are recovered with
/// fallbacks instead.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A field was assigned a value of the wrong kind.
    #[error("field {field} expects a {expected} value, got {found}")]
    FieldTypeMismatch {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// An identifier could not be constructed.
    #[error(transparent)]
    InvalidId(#[from] harvest_types::Error),
}
