//! Error types for the gate facade.

use rolegate_core::{CoreError, ValidationError};
use rolegate_perms::{AccessError, PermsError};
use rolegate_store::StoreError;
use thiserror::Error;

/// Errors that can occur during gate operations.
#[derive(Debug, Error)]
pub enum GateError {
    /// Rejected input, reported per field.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The caller may not perform the operation.
    #[error("access denied: {0}")]
    Access(#[from] AccessError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    /// A blocking worker panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// HTTP status class for the surrounding transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            GateError::Validation(_) => 400,
            GateError::Access(e) => e.status_code(),
            GateError::NotFound(_) => 404,
            GateError::Store(StoreError::Unavailable(_)) => 503,
            GateError::Store(_)
            | GateError::PasswordHash(_)
            | GateError::Task(_)
            | GateError::Config(_) => 500,
        }
    }
}

impl From<PermsError> for GateError {
    fn from(e: PermsError) -> Self {
        GateError::Access(e.into())
    }
}

impl From<CoreError> for GateError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(v) => GateError::Validation(v),
            CoreError::InvalidCodename(raw, reason) => GateError::Validation(
                ValidationError::field("codename", format!("{raw:?}: {reason}")),
            ),
        }
    }
}

/// Turn store failures on user input into field errors.
///
/// Unique violations become a [`ValidationError`] on the colliding field and
/// missing references become [`GateError::NotFound`].
pub(crate) fn input_error(e: StoreError) -> GateError {
    match e {
        StoreError::UniqueViolation { field } => {
            let message = format!("{field} already exists");
            GateError::Validation(ValidationError::field(field, message))
        }
        StoreError::NotFound(what) => GateError::NotFound(what),
        other => GateError::Store(other),
    }
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
