//! Error types for everynote-core

use std::ffi::c_int;

use thiserror::Error;

/// Primary `SQLite` result codes that mean the store itself is unusable
const SQLITE_IOERR: c_int = 10;
const SQLITE_CORRUPT: c_int = 11;
const SQLITE_FULL: c_int = 13;
const SQLITE_CANTOPEN: c_int = 14;
const SQLITE_NOTADB: c_int = 26;

/// Result type alias using everynote-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in everynote-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The backing store could not be opened or initialized
    #[error("Note store unavailable: {0}")]
    StoreUnavailable(String),

    /// A note with the same id already exists
    #[error("Note already exists: {0}")]
    ConstraintViolation(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored row did not match the Notes schema
    #[error("Malformed note row: {0}")]
    Decode(String),

    /// libSQL error
    #[error("Database error: {0}")]
    Database(#[source] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure should block further note operations until the
    /// store is reopened.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<libsql::Error> for Error {
    fn from(error: libsql::Error) -> Self {
        match error {
            // Extended result codes keep the primary code in the low byte
            libsql::Error::SqliteFailure(code, message)
                if matches!(
                    code & 0xff,
                    SQLITE_IOERR | SQLITE_CORRUPT | SQLITE_FULL | SQLITE_CANTOPEN | SQLITE_NOTADB
                ) =>
            {
                Self::StoreUnavailable(message)
            }
            other => Self::Database(other),
        }
    }
}
