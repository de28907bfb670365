//! Error types for rolegate core.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Core errors that can occur while constructing domain values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid codename {0:?}: {1}")]
    InvalidCodename(String, &'static str),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// The offending field name, as exposed to callers.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

/// Structured per-field validation failure.
///
/// Returned by catalog, role, assignment and account mutations. Callers render
/// it as a field -> messages map; it is never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Create an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field shorthand.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.push(field, message);
        err
    }

    /// Record another rejected field.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// True when no field was rejected.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether a particular field was rejected.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` if empty, otherwise `Err(self)`.
    pub fn into_result(self) -> std::result::Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for e in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
            first = false;
        }
        Ok(())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_joins_fields() {
        let mut err = ValidationError::new();
        err.push("username", "may not be blank");
        err.push("email", "enter a valid email address");
        assert_eq!(
            err.to_string(),
            "username: may not be blank; email: enter a valid email address"
        );
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationError::new().into_result().is_ok());
        let err = ValidationError::field("name", "too long")
            .into_result()
            .unwrap_err();
        assert!(err.has_field("name"));
        assert!(!err.has_field("description"));
    }
}
