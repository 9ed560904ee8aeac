//! Error types for the sync layer.

use harvest_model::ModelError;
use thiserror::Error;

/// Result type for remote transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Failure of a remote call.
///
/// Cloneable so one failure can be returned to the caller and published to a
/// notice channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Could not reach the service.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with an error status.
    #[error("rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No answer within the configured timeout.
    #[error("remote call timed out")]
    Timeout,

    /// The response could not be read at all.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A mutation intent does not fit the entity it targets.
    #[error("invalid mutation: {0}")]
    Model(#[from] ModelError),
}
