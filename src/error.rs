//! Recoverable store failures.
//!
//! Actions never return these: they are rendered into the `error` field of
//! the store state. The pure helpers return them through [`Result`].

use crate::identifier::Identifier;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while applying a store operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Item with {key}={id} already exists.")]
    DuplicateIdentifier { key: String, id: Identifier },

    #[error("No entity to update.")]
    MissingEntity,

    #[error("patch must be an object, got {kind}")]
    InvalidPatch { kind: &'static str },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
