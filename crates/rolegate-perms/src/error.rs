//! Error types for the permissions module.

use std::fmt;

use rolegate_core::Codename;
use rolegate_store::StoreError;
use thiserror::Error;

/// Errors from the decision engine.
///
/// A missing grant is never an error; it is a [`Decision::Denied`] value.
/// Only storage failure surfaces here.
///
/// [`Decision::Denied`]: crate::Decision::Denied
#[derive(Debug, Error)]
pub enum PermsError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Why an authenticated principal was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The target resource belongs to someone else.
    NotOwner,
    /// The principal holds no role granting this codename.
    MissingPermission(Codename),
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::NotOwner => f.write_str("not owner"),
            Denial::MissingPermission(codename) => {
                write!(f, "no '{}' permission", codename)
            }
        }
    }
}

/// Outcome of a rejected guarded operation.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No principal was resolved for the request.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated, but not permitted.
    #[error("forbidden: {0}")]
    Forbidden(Denial),

    /// The persistence backend could not answer.
    #[error("storage unavailable: {0}")]
    Storage(#[from] StoreError),
}

impl AccessError {
    /// HTTP status class for the surrounding transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::Unauthenticated => 401,
            AccessError::Forbidden(_) => 403,
            AccessError::Storage(_) => 503,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, AccessError::Forbidden(_))
    }
}

impl From<PermsError> for AccessError {
    fn from(e: PermsError) -> Self {
        match e {
            PermsError::Store(e) => AccessError::Storage(e),
        }
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
