//! # rolegate core
//!
//! Pure domain primitives for role-based access control: principals, roles,
//! permissions and the associations between them.
//!
//! This crate contains no I/O and no storage. It is shared by the store, the
//! decision engine and the facade.
//!
//! ## Key Types
//!
//! - [`Principal`] - A user account, subject of every check
//! - [`Permission`] - A catalog entry keyed by its [`Codename`]
//! - [`Role`] - A named bundle of permissions
//! - [`RoleGrant`] / [`Assignment`] - The two many-to-many association rows
//! - [`ValidationError`] - Structured per-field input rejection
//!
//! ## Seeding
//!
//! The catalog seed resolution policy lives in [`seed`] so that every store
//! backend applies exactly the same rules.

pub mod codename;
pub mod error;
pub mod model;
pub mod seed;
pub mod types;
pub mod validation;

pub use codename::Codename;
pub use error::{CoreError, FieldError, Result, ValidationError};
pub use model::{
    Assignment, AssignmentDetail, GrantDetail, NewPermission, NewPrincipal, NewRole, NewUser,
    Permission, PermissionPatch, Principal, Role, RoleGrant, RolePatch, TableCounts, UserPatch,
};
pub use seed::{plan_permission_seed, PermissionSeed, SeedOutcome, SeedPlan};
pub use types::{AssignmentId, GrantId, PermissionId, RoleId, UserId};
