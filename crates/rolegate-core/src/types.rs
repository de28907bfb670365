//! Strong identifier types for rolegate.
//!
//! All identifiers are newtypes over the storage row id so that a role id
//! can never be passed where a user id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw row id.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Get the raw row id.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

row_id!(
    /// Identifier of a principal (user account).
    UserId
);
row_id!(
    /// Identifier of a role.
    RoleId
);
row_id!(
    /// Identifier of a permission in the catalog.
    PermissionId
);
row_id!(
    /// Identifier of a role -> permission grant row.
    GrantId
);
row_id!(
    /// Identifier of a user -> role assignment row.
    AssignmentId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(UserId::new(42).to_string(), "42");
    }

    #[test]
    fn test_id_debug_names_type() {
        assert_eq!(format!("{:?}", RoleId::new(7)), "RoleId(7)");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&PermissionId::new(3)).unwrap();
        assert_eq!(json, "3");
    }
}
