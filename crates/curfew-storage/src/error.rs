//! Storage error types.

use curfew_core::LookupError;
use thiserror::Error;

/// Errors from the settings and catalog store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored value could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Creating the database directory failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the connection.
    #[error("Connection lock poisoned")]
    Poisoned,

    /// The environment does not allow opening the store (no data directory).
    #[error("Configuration error: {0}")]
    Config(String),
}

/// The catalog seen by the evaluator is this store, so its failures become
/// lookup failures. Anything that keeps the store from being reached is
/// `Unavailable`; errors from a reachable store are `Failed`.
impl From<StorageError> for LookupError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Poisoned | StorageError::Config(_) | StorageError::Io(_) => {
                LookupError::Unavailable(err.to_string())
            }
            _ => LookupError::Failed(err.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
