//! Error types for the collaboration crate.

use crate::transport::TransportError;
use thiserror::Error;

/// Result type alias for collaboration operations.
pub type CollabResult<T> = Result<T, CollabError>;

/// Errors that can occur during collaboration operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollabError {
    /// The underlying transport rejected a publish or subscribe.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A payload declared a wire version newer than this build understands.
    #[error("Unsupported wire version: {found} (supported up to {supported})")]
    UnsupportedWireVersion { found: u32, supported: u32 },
}
