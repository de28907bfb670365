//! Permission codenames.
//!
//! A codename is the stable machine key of a permission. Every access check
//! is phrased in terms of a [`Codename`], never a display name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum codename length, matching the catalog column.
pub const MAX_CODENAME_LEN: usize = 50;

/// A validated permission codename.
///
/// Non-empty, at most [`MAX_CODENAME_LEN`] bytes, ASCII lowercase letters,
/// digits and `_` only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Codename(String);

impl Codename {
    /// Parse and validate a codename.
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        match rejection(&raw) {
            Some(reason) => Err(CoreError::InvalidCodename(raw, reason)),
            None => Ok(Self(raw)),
        }
    }

    /// Codename from a compile-time literal.
    ///
    /// Used for the built-in catalog and operation declarations, whose
    /// literals are covered by tests.
    pub fn from_static(raw: &'static str) -> Self {
        debug_assert!(rejection(raw).is_none(), "invalid codename literal {raw:?}");
        Self(raw.to_string())
    }

    /// The codename as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this codename names a read-only permission (`*_view`).
    pub fn is_view(&self) -> bool {
        self.0.ends_with("_view")
    }
}

fn rejection(raw: &str) -> Option<&'static str> {
    if raw.is_empty() {
        return Some("must not be empty");
    }
    if raw.len() > MAX_CODENAME_LEN {
        return Some("longer than 50 characters");
    }
    if !raw
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return Some("only lowercase letters, digits and '_' are allowed");
    }
    None
}

impl fmt::Display for Codename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Codename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Codename {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Codename {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Codename> for String {
    fn from(c: Codename) -> Self {
        c.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accepts_catalog_codenames() {
        for raw in ["user_view", "role_permission_delete", "user_change_password"] {
            assert_eq!(Codename::new(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            Codename::new(""),
            Err(CoreError::InvalidCodename(_, "must not be empty"))
        ));
    }

    #[test]
    fn test_rejects_uppercase_and_spaces() {
        assert!(Codename::new("User_View").is_err());
        assert!(Codename::new("user view").is_err());
        assert!(Codename::new("查看用户").is_err());
    }

    #[test]
    fn test_rejects_too_long() {
        assert!(Codename::new("a".repeat(51)).is_err());
        assert!(Codename::new("a".repeat(50)).is_ok());
    }

    #[test]
    fn test_is_view() {
        assert!(Codename::new("role_view").unwrap().is_view());
        assert!(!Codename::new("role_create").unwrap().is_view());
        assert!(!Codename::new("view_role").unwrap().is_view());
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let ok: Codename = serde_json::from_str("\"user_view\"").unwrap();
        assert_eq!(ok.as_str(), "user_view");
        assert!(serde_json::from_str::<Codename>("\"\"").is_err());
    }

    proptest! {
        #[test]
        fn valid_alphabet_always_parses(raw in "[a-z0-9_]{1,50}") {
            prop_assert!(Codename::new(raw).is_ok());
        }
    }
}
