//! Error types for the content store collaborator.

use blockdrop_core::ContentAddress;
use thiserror::Error;

/// Errors from the backing content-addressed store.
///
/// The cache has no errors of its own; it passes these through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentStoreError {
    /// No blob at this address.
    #[error("content not found: {0}")]
    NotFound(ContentAddress),

    /// The store could not be reached.
    #[error("content store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for content store operations.
pub type Result<T> = std::result::Result<T, ContentStoreError>;

/// Snapshot persistence failures.
///
/// Never surfaced to `get`/`set` callers: the cache logs them and carries on
/// without persistence.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Encode(String),

    #[error("snapshot decoding failed: {0}")]
    Decode(String),

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
