//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The validation code being written already exists on another grant.
    ///
    /// The unique index on the code column is the authoritative collision
    /// detector; callers regenerate the code and retry once.
    #[error("validation code already in use")]
    DuplicateCode,

    /// Invalid data in storage (corrupt enum value, wrong blob length).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("store mutex poisoned")]
    Poisoned,

    /// A blocking task could not be joined.
    #[error("blocking task failed: {0}")]
    Background(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
