//! Error types for the store module.

use rusqlite::ffi;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    /// A uniqueness constraint rejected the write.
    #[error("{field} already exists")]
    UniqueViolation {
        /// Column that collided, e.g. `username` or `codename`.
        field: String,
    },

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The backend cannot be reached (poisoned lock, failed worker thread).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this is a uniqueness collision rather than a backend failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref e, ref msg) = err {
            match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return StoreError::UniqueViolation {
                        field: msg
                            .as_deref()
                            .map(unique_column)
                            .unwrap_or("row")
                            .to_string(),
                    };
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return StoreError::NotFound("referenced row".into());
                }
                _ => {}
            }
            if matches!(
                e.code,
                ffi::ErrorCode::DatabaseBusy
                    | ffi::ErrorCode::DatabaseLocked
                    | ffi::ErrorCode::CannotOpen
                    | ffi::ErrorCode::SystemIoFailure
            ) {
                return StoreError::Unavailable(err.to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// Extract the column name from `"UNIQUE constraint failed: users.username"`.
///
/// Composite constraints report every column; the last one is returned.
fn unique_column(msg: &str) -> &str {
    msg.rsplit(['.', ' '])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("row")
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
