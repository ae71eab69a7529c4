//! Common error types for docsync.

use thiserror::Error;

/// Top-level error type for docsync operations.
///
/// A missing record is not an error: lookups return `Option` and
/// predicate operations return empty results.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Sync operation failed.
    #[error("Sync error: {0}")]
    Sync(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
