//! Domain entities.
//!
//! The authorization graph is a flat two-hop many-to-many relation:
//! `Principal -(Assignment)-> Role -(RoleGrant)-> Permission`. There is no
//! role hierarchy and no inheritance between roles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codename::Codename;
use crate::types::{AssignmentId, GrantId, PermissionId, RoleId, UserId};

/// A user account, the subject of every authorization check.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    /// Globally unique login name.
    pub username: String,
    /// Globally unique email address.
    pub email: String,
    /// bcrypt hash; never serialized to callers.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    /// Absolute bypass: checked before any table lookup.
    pub is_superuser: bool,
    /// Unix milliseconds.
    pub date_joined: i64,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .field("is_staff", &self.is_staff)
            .field("is_superuser", &self.is_superuser)
            .finish_non_exhaustive()
    }
}

/// Account registration input, carrying the plaintext password.
#[derive(Clone, Default, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// A principal row ready for insertion (password already hashed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrincipal {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Partial update of a principal's profile and flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
}

/// An entry of the permission catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    /// Stable machine key used by every access check.
    pub codename: Codename,
    /// Unique human label.
    pub name: String,
    pub description: String,
}

/// Catalog insertion input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPermission {
    pub codename: Codename,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Partial update of a catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PermissionPatch {
    pub codename: Option<Codename>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
}

/// Role insertion input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NewRole {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Partial update of a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RolePatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Role -> permission association. `(role_id, permission_id)` is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub id: GrantId,
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

/// A grant joined with the names of both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantDetail {
    #[serde(flatten)]
    pub grant: RoleGrant,
    pub role_name: String,
    pub permission_name: String,
    pub codename: Codename,
}

/// User -> role association. `(user_id, role_id)` is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub user_id: UserId,
    pub role_id: RoleId,
}

/// An assignment joined with the username and role name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentDetail {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub username: String,
    pub role_name: String,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub users: u64,
    pub permissions: u64,
    pub roles: u64,
    pub grants: u64,
    pub assignments: u64,
}
