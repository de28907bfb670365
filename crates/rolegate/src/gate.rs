//! The Gate: unified API for rolegate.
//!
//! The Gate brings together the store, the decision engine and the
//! enforcement wrapper behind one handle, and owns account management.

use std::future::Future;
use std::sync::Arc;

use rolegate_core::validation::{
    validate_new_permission, validate_new_role, validate_new_user, validate_password,
    validate_permission_patch, validate_role_patch, validate_user_patch,
};
use rolegate_core::{
    Assignment, AssignmentDetail, AssignmentId, Codename, GrantDetail, GrantId, NewPermission,
    NewPrincipal, NewRole, NewUser, Permission, PermissionId, PermissionPatch, Principal, Role,
    RoleId, RolePatch, UserId, UserPatch, ValidationError,
};
use rolegate_perms::{check_ownership, Access, Decision, DecisionEngine, Enforcer, Operation, Owned};
use rolegate_store::{InsertResult, SqliteStore, Store};
use tracing::{debug, info};

use crate::config::GateConfig;
use crate::error::{input_error, GateError, Result};

/// The main Gate struct.
///
/// Provides a unified API for:
/// - Access decisions and ownership checks
/// - Guarding declared operations
/// - Account registration, authentication and password changes
/// - Managing roles, permissions, grants and assignments
/// - Bootstrapping the permission catalog
pub struct Gate<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Decision engine and enforcement wrapper over `store`.
    enforcer: Enforcer<S>,
    /// Configuration.
    config: GateConfig,
}

impl<S: Store> Clone for Gate<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            enforcer: self.enforcer.clone(),
            config: self.config.clone(),
        }
    }
}

impl Gate<SqliteStore> {
    /// Open the SQLite database named by `config`.
    pub fn open(config: GateConfig) -> Result<Self> {
        config.validate()?;
        let store = SqliteStore::open(&config.database_path)?;
        Ok(Self::new(store, config))
    }
}

impl<S: Store> Gate<S> {
    /// Create a new gate over `store`.
    pub fn new(store: S, config: GateConfig) -> Self {
        Self::with_shared(Arc::new(store), config)
    }

    /// Create a gate over a store shared with other handles.
    pub fn with_shared(store: Arc<S>, config: GateConfig) -> Self {
        let enforcer = Enforcer::new(DecisionEngine::new(Arc::clone(&store)));
        Self {
            store,
            enforcer,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn engine(&self) -> &DecisionEngine<S> {
        self.enforcer.engine()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decisions
    // ─────────────────────────────────────────────────────────────────────────

    /// Decide whether `principal` holds `codename`.
    pub async fn authorize(
        &self,
        principal: &Principal,
        codename: Option<&Codename>,
    ) -> Result<Decision> {
        Ok(self.engine().authorize(principal, codename).await?)
    }

    /// Decide whether `principal` may act on `target` as its owner.
    pub fn check_ownership(&self, principal: &Principal, target: &dyn Owned) -> Decision {
        check_ownership(principal, target)
    }

    /// Codenames currently held by `principal`.
    pub async fn effective_codenames(&self, principal: &Principal) -> Result<Vec<Codename>> {
        Ok(self.engine().effective_codenames(principal).await?)
    }

    /// Run the enforcement wrapper for a declared operation.
    pub async fn guard(
        &self,
        actor: Option<&Principal>,
        operation: Operation,
        target: Option<&dyn Owned>,
    ) -> Result<()> {
        match operation.access() {
            Access::Public => Ok(()),
            Access::Guarded(policy) => {
                let outcome = self.enforcer.check(actor, &policy, target).await;
                if let Err(e) = &outcome {
                    debug!(%operation, error = %e, "operation rejected");
                }
                Ok(outcome?)
            }
        }
    }

    /// Guard `operation`, then run `handler` and return its result unchanged.
    pub async fn run_guarded<F, T>(
        &self,
        actor: Option<&Principal>,
        operation: Operation,
        target: Option<&dyn Owned>,
        handler: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.guard(actor, operation, target).await?;
        handler.await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an active, unprivileged account.
    pub async fn register_user(&self, user: NewUser) -> Result<Principal> {
        self.create_account(user, false).await
    }

    /// Create an account with the staff and superuser flags set.
    pub async fn create_superuser(&self, user: NewUser) -> Result<Principal> {
        self.create_account(user, true).await
    }

    pub(crate) async fn create_account(&self, user: NewUser, superuser: bool) -> Result<Principal> {
        validate_new_user(&user)?;
        let password_hash = self.hash_password(user.password).await?;

        let principal = self
            .store
            .insert_user(&NewPrincipal {
                username: user.username,
                email: user.email,
                password_hash,
                first_name: user.first_name,
                last_name: user.last_name,
                is_active: true,
                is_staff: superuser,
                is_superuser: superuser,
            })
            .await
            .map_err(input_error)?;

        info!(user = %principal.id, username = %principal.username, superuser, "account created");
        Ok(principal)
    }

    /// Resolve credentials to an active principal.
    ///
    /// Unknown usernames, wrong passwords and inactive accounts all yield
    /// `None`.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Principal>> {
        let Some(principal) = self.store.get_user_by_username(username).await? else {
            debug!(username, "authentication failed: unknown user");
            return Ok(None);
        };
        if !principal.is_active {
            debug!(user = %principal.id, "authentication failed: inactive");
            return Ok(None);
        }
        if !self
            .verify_password(password, &principal.password_hash)
            .await?
        {
            debug!(user = %principal.id, "authentication failed: bad password");
            return Ok(None);
        }
        Ok(Some(principal))
    }

    /// Change `target`'s password. Requires ownership and
    /// `user_change_password`, then the correct old password.
    pub async fn change_password(
        &self,
        actor: Option<&Principal>,
        target: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let Some(user) = self.store.get_user(target).await? else {
            // Anonymous callers learn nothing about which ids exist.
            self.guard(actor, Operation::UserChangePassword, None).await?;
            return Err(GateError::NotFound(format!("user {target}")));
        };
        self.guard(actor, Operation::UserChangePassword, Some(&user))
            .await?;

        if !self
            .verify_password(old_password, &user.password_hash)
            .await?
        {
            return Err(ValidationError::field("old_password", "old password is incorrect").into());
        }
        validate_password("new_password", new_password)?;

        let hash = self.hash_password(new_password.to_string()).await?;
        self.store.set_password_hash(target, &hash).await?;
        info!(user = %target, "password changed");
        Ok(())
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<Principal>> {
        Ok(self.store.get_user(id).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<Principal>> {
        Ok(self.store.list_users().await?)
    }

    pub async fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<Principal> {
        validate_user_patch(patch)?;
        self.store.update_user(id, patch).await.map_err(input_error)
    }

    pub async fn delete_user(&self, id: UserId) -> Result<bool> {
        Ok(self.store.delete_user(id).await?)
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let cost = self.config.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hash)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        if hash.is_empty() {
            return Ok(false);
        }
        let password = password.to_string();
        let hash = hash.to_string();
        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
        // A malformed stored hash never authenticates.
        Ok(matched.unwrap_or(false))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_role(&self, role: &NewRole) -> Result<Role> {
        validate_new_role(role)?;
        let role = self.store.insert_role(role).await.map_err(input_error)?;
        info!(role = %role.id, name = %role.name, "role created");
        Ok(role)
    }

    pub async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.store.get_role(id).await?)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.store.list_roles().await?)
    }

    pub async fn update_role(&self, id: RoleId, patch: &RolePatch) -> Result<Role> {
        validate_role_patch(patch)?;
        self.store.update_role(id, patch).await.map_err(input_error)
    }

    /// Delete a role together with its grants and assignments.
    pub async fn delete_role(&self, id: RoleId) -> Result<bool> {
        let deleted = self.store.delete_role(id).await?;
        if deleted {
            info!(role = %id, "role deleted");
        }
        Ok(deleted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_permission(&self, perm: &NewPermission) -> Result<Permission> {
        validate_new_permission(perm)?;
        self.store.insert_permission(perm).await.map_err(input_error)
    }

    pub async fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        Ok(self.store.get_permission(id).await?)
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>> {
        Ok(self.store.list_permissions().await?)
    }

    pub async fn update_permission(
        &self,
        id: PermissionId,
        patch: &PermissionPatch,
    ) -> Result<Permission> {
        validate_permission_patch(patch)?;
        self.store
            .update_permission(id, patch)
            .await
            .map_err(input_error)
    }

    pub async fn delete_permission(&self, id: PermissionId) -> Result<bool> {
        Ok(self.store.delete_permission(id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grants and assignments
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant `permission` to `role`. Granting twice is a no-op.
    pub async fn grant(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<InsertResult<GrantId>> {
        self.store
            .grant_permission(role, permission)
            .await
            .map_err(input_error)
    }

    pub async fn revoke(&self, role: RoleId, permission: PermissionId) -> Result<bool> {
        Ok(self.store.revoke_permission(role, permission).await?)
    }

    pub async fn grants(&self, role: Option<RoleId>) -> Result<Vec<GrantDetail>> {
        Ok(self.store.list_grants(role).await?)
    }

    /// Assign `role` to `user`. Assigning twice is a no-op.
    pub async fn assign(&self, user: UserId, role: RoleId) -> Result<InsertResult<AssignmentId>> {
        self.store.assign_role(user, role).await.map_err(input_error)
    }

    pub async fn unassign(&self, user: UserId, role: RoleId) -> Result<bool> {
        Ok(self.store.unassign_role(user, role).await?)
    }

    pub async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>> {
        Ok(self.store.get_assignment(id).await?)
    }

    pub async fn assignments(&self, user: Option<UserId>) -> Result<Vec<AssignmentDetail>> {
        Ok(self.store.list_assignments(user).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegate_perms::{AccessError, Denial};
    use rolegate_store::MemoryStore;

    fn gate() -> Gate<MemoryStore> {
        Gate::new(MemoryStore::new(), GateConfig::for_tests())
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let gate = gate();
        let user = gate
            .register_user(NewUser::new("alice", "alice@example.com", "password1"))
            .await
            .unwrap();
        assert!(!user.is_superuser);
        assert_ne!(user.password_hash, "password1");

        let found = gate.authenticate("alice", "password1").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(user.id));
        assert!(gate.authenticate("alice", "wrong-pass").await.unwrap().is_none());
        assert!(gate.authenticate("nobody", "password1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactive_account_cannot_authenticate() {
        let gate = gate();
        let user = gate
            .register_user(NewUser::new("bob", "bob@example.com", "password1"))
            .await
            .unwrap();
        let patch = UserPatch {
            is_active: Some(false),
            ..UserPatch::default()
        };
        gate.update_user(user.id, &patch).await.unwrap();

        assert!(gate.authenticate("bob", "password1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let gate = gate();
        let err = gate
            .register_user(NewUser::new("carol", "not-an-email", "short"))
            .await
            .unwrap_err();
        match err {
            GateError::Validation(v) => {
                assert!(v.has_field("email"));
                assert!(v.has_field("password"));
            }
            other => panic!("unexpected {other:?}"),
        }

        gate.register_user(NewUser::new("carol", "carol@example.com", "password1"))
            .await
            .unwrap();
        let err = gate
            .register_user(NewUser::new("carol", "carol2@example.com", "password1"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Validation(ref v) if v.has_field("username")));
    }

    #[tokio::test]
    async fn test_change_password_requires_ownership_first() {
        let gate = gate();
        let alice = gate
            .register_user(NewUser::new("alice", "alice@example.com", "password1"))
            .await
            .unwrap();
        let bob = gate
            .register_user(NewUser::new("bob", "bob@example.com", "password1"))
            .await
            .unwrap();

        let err = gate
            .change_password(Some(&bob), alice.id, "password1", "password2")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::Access(AccessError::Forbidden(Denial::NotOwner))
        ));

        let err = gate
            .change_password(None, alice.id, "password1", "password2")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);

        // Owner, but without the codename.
        let err = gate
            .change_password(Some(&alice), alice.id, "password1", "password2")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::Access(AccessError::Forbidden(Denial::MissingPermission(_)))
        ));
    }

    #[tokio::test]
    async fn test_superuser_changes_any_password() {
        let gate = gate();
        let root = gate
            .create_superuser(NewUser::new("root", "root@example.com", "password1"))
            .await
            .unwrap();
        assert!(root.is_superuser && root.is_staff);

        let dave = gate
            .register_user(NewUser::new("dave", "dave@example.com", "password1"))
            .await
            .unwrap();

        let err = gate
            .change_password(Some(&root), dave.id, "wrong-old", "password2")
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Validation(ref v) if v.has_field("old_password")));

        let err = gate
            .change_password(Some(&root), dave.id, "password1", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Validation(ref v) if v.has_field("new_password")));

        gate.change_password(Some(&root), dave.id, "password1", "password2")
            .await
            .unwrap();
        assert!(gate.authenticate("dave", "password2").await.unwrap().is_some());
        assert!(gate.authenticate("dave", "password1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_public_operations_need_no_principal() {
        let gate = gate();
        gate.guard(None, Operation::Login, None).await.unwrap();
        gate.guard(None, Operation::UserCreate, None).await.unwrap();
        let err = gate.guard(None, Operation::RoleList, None).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_run_guarded_returns_handler_result() {
        let gate = gate();
        let root = gate
            .create_superuser(NewUser::new("root", "root@example.com", "password1"))
            .await
            .unwrap();

        let roles = gate
            .run_guarded(Some(&root), Operation::RoleCreate, None, async {
                gate.create_role(&NewRole::new("auditor", "read only")).await
            })
            .await
            .unwrap();
        assert_eq!(roles.name, "auditor");

        let err = gate
            .run_guarded(Some(&root), Operation::RoleCreate, None, async {
                gate.create_role(&NewRole::new("auditor", "")).await
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Validation(ref v) if v.has_field("name")));
    }

    #[tokio::test]
    async fn test_grant_to_missing_role_not_found() {
        let gate = gate();
        let err = gate
            .grant(RoleId::new(99), PermissionId::new(98))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::NotFound(_)));
    }
}
