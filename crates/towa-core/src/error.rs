//! Error types for towa collaborators.

use thiserror::Error;

/// Result type alias using towa's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for storage, index and service operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Letter not found
    #[error("Letter not found: {0}")]
    LetterNotFound(uuid::Uuid),

    /// Unique constraint violated (e.g. the same opener recorded twice)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Blob storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
