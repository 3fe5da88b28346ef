//! Error types for wordsync-core

use rusqlite::ErrorCode;
use thiserror::Error;

/// Result type alias using wordsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wordsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// `SQLite` error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Lock contention that outlived the retry budget
    #[error("Database is busy after {attempts} attempts: {message}")]
    Contention {
        /// Number of attempts made before giving up
        attempts: u32,
        /// Message of the last storage error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Word not found
    #[error("Word not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the storage engine reported a lock conflict that may clear on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(rusqlite::Error::SqliteFailure(failure, _)) => matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
