//! Store trait: the abstract interface for authorization-state persistence.
//!
//! This trait allows the decision engine and the facade to be
//! storage-agnostic. Implementations include SQLite (primary) and in-memory
//! (for tests).

use async_trait::async_trait;
use rolegate_core::{
    Assignment, AssignmentDetail, AssignmentId, Codename, GrantDetail, GrantId, NewPermission,
    NewPrincipal, NewRole, Permission, PermissionId, PermissionPatch, PermissionSeed, Principal,
    Role, RoleId, RolePatch, SeedOutcome, TableCounts, UserId, UserPatch,
};

use crate::error::Result;

/// Result of inserting an association row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult<Id> {
    /// Row was inserted.
    Inserted(Id),
    /// The pair already exists (idempotent - not an error).
    AlreadyExists(Id),
}

impl<Id: Copy> InsertResult<Id> {
    /// The id of the row, new or existing.
    pub fn id(&self) -> Id {
        match self {
            InsertResult::Inserted(id) | InsertResult::AlreadyExists(id) => *id,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertResult::Inserted(_))
    }
}

/// The Store trait: async interface for the identity store, permission
/// catalog, role registry and both association tables.
///
/// # Design Notes
///
/// - **Uniqueness**: username, email, codename, permission name, role name,
///   `(role, permission)` and `(user, role)` are unique at the storage layer.
///   Entity writes that collide return `StoreError::UniqueViolation`;
///   association inserts that collide return `InsertResult::AlreadyExists`.
/// - **Cascades**: deleting a role removes its grants and assignments,
///   deleting a permission removes its grants, deleting a user removes its
///   assignments.
/// - **Reads are side-effect free**: decision queries never write.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Identity Store
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a principal. `date_joined` is assigned by the store.
    async fn insert_user(&self, user: &NewPrincipal) -> Result<Principal>;

    async fn get_user(&self, id: UserId) -> Result<Option<Principal>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<Principal>>;

    /// All principals, ordered by id.
    async fn list_users(&self) -> Result<Vec<Principal>>;

    /// Apply a partial update. `NotFound` if the user does not exist.
    async fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<Principal>;

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<()>;

    /// Delete a principal and its assignments. Returns false if absent.
    async fn delete_user(&self, id: UserId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Catalog
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_permission(&self, perm: &NewPermission) -> Result<Permission>;

    async fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>>;

    async fn get_permission_by_codename(&self, codename: &Codename) -> Result<Option<Permission>>;

    /// All permissions, ordered by id.
    async fn list_permissions(&self) -> Result<Vec<Permission>>;

    async fn update_permission(
        &self,
        id: PermissionId,
        patch: &PermissionPatch,
    ) -> Result<Permission>;

    /// Delete a permission and its grants. Returns false if absent.
    async fn delete_permission(&self, id: PermissionId) -> Result<bool>;

    /// Apply one catalog seed entry atomically.
    ///
    /// The codename lookup, the display-name lookup and the resulting write
    /// happen in a single transaction, following
    /// [`rolegate_core::plan_permission_seed`].
    async fn apply_permission_seed(
        &self,
        seed: &PermissionSeed,
        run_stamp: i64,
    ) -> Result<SeedOutcome>;

    // ─────────────────────────────────────────────────────────────────────────
    // Role Registry
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_role(&self, role: &NewRole) -> Result<Role>;

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>>;

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// All roles, ordered by id.
    async fn list_roles(&self) -> Result<Vec<Role>>;

    async fn update_role(&self, id: RoleId, patch: &RolePatch) -> Result<Role>;

    /// Delete a role with its grants and assignments. Returns false if absent.
    async fn delete_role(&self, id: RoleId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Role-Permission Grant Table
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant a permission to a role. Idempotent.
    async fn grant_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<InsertResult<GrantId>>;

    /// Remove a grant. Returns false if it did not exist.
    async fn revoke_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool>;

    /// Grants, optionally restricted to one role, ordered by id.
    async fn list_grants(&self, role: Option<RoleId>) -> Result<Vec<GrantDetail>>;

    // ─────────────────────────────────────────────────────────────────────────
    // User-Role Assignment Table
    // ─────────────────────────────────────────────────────────────────────────

    /// Assign a role to a user. Idempotent.
    async fn assign_role(&self, user: UserId, role: RoleId) -> Result<InsertResult<AssignmentId>>;

    /// Remove an assignment. Returns false if it did not exist.
    async fn unassign_role(&self, user: UserId, role: RoleId) -> Result<bool>;

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>>;

    /// Assignments, optionally restricted to one user, ordered by id.
    async fn list_assignments(&self, user: Option<UserId>) -> Result<Vec<AssignmentDetail>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Decision Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Roles assigned to a user, ascending.
    async fn role_ids_for_user(&self, user: UserId) -> Result<Vec<RoleId>>;

    /// Whether any role assigned to `user` is granted `codename`.
    ///
    /// A codename absent from the catalog simply matches nothing.
    async fn has_permission(&self, user: UserId, codename: &Codename) -> Result<bool>;

    /// Codenames reachable from a user's roles, ascending and deduplicated.
    async fn codenames_for_user(&self, user: UserId) -> Result<Vec<Codename>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Row counts of every table.
    async fn counts(&self) -> Result<TableCounts>;
}
