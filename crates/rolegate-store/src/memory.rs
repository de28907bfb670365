//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite,
//! including uniqueness violations and delete cascades, but keeps everything
//! in memory with no persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use rolegate_core::{
    plan_permission_seed, Assignment, AssignmentDetail, AssignmentId, Codename, GrantDetail,
    GrantId, NewPermission, NewPrincipal, NewRole, Permission, PermissionId, PermissionPatch,
    PermissionSeed, Principal, Role, RoleGrant, RoleId, RolePatch, SeedOutcome, SeedPlan,
    TableCounts, UserId, UserPatch,
};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; every
/// mutation runs under a single write guard, which makes it atomic.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Last issued row id (shared sequence, ids are never reused).
    last_id: i64,
    users: BTreeMap<UserId, Principal>,
    permissions: BTreeMap<PermissionId, Permission>,
    roles: BTreeMap<RoleId, Role>,
    grants: BTreeMap<GrantId, RoleGrant>,
    assignments: BTreeMap<AssignmentId, Assignment>,
}

impl MemoryStoreInner {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn unique(clash: bool, field: &str) -> Result<()> {
        if clash {
            return Err(StoreError::UniqueViolation {
                field: field.to_string(),
            });
        }
        Ok(())
    }

    fn check_user_unique(&self, id: Option<UserId>, username: &str, email: &str) -> Result<()> {
        let mut others = self.users.values().filter(|u| Some(u.id) != id);
        Self::unique(others.clone().any(|u| u.username == username), "username")?;
        Self::unique(others.any(|u| u.email == email), "email")
    }

    fn check_permission_unique(
        &self,
        id: Option<PermissionId>,
        codename: &Codename,
        name: &str,
    ) -> Result<()> {
        let mut others = self.permissions.values().filter(|p| Some(p.id) != id);
        Self::unique(others.clone().any(|p| &p.codename == codename), "codename")?;
        Self::unique(others.any(|p| p.name == name), "name")
    }

    fn check_role_unique(&self, id: Option<RoleId>, name: &str) -> Result<()> {
        Self::unique(
            self.roles.values().any(|r| Some(r.id) != id && r.name == name),
            "name",
        )
    }

    fn permission_by_name(&self, name: &str) -> Option<&Permission> {
        self.permissions.values().find(|p| p.name == name)
    }

    fn permission_by_codename(&self, codename: &Codename) -> Option<&Permission> {
        self.permissions.values().find(|p| &p.codename == codename)
    }

    fn role_ids_for(&self, user: UserId) -> BTreeSet<RoleId> {
        self.assignments
            .values()
            .filter(|a| a.user_id == user)
            .map(|a| a.role_id)
            .collect()
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &NewPrincipal) -> Result<Principal> {
        let mut inner = self.write()?;
        inner.check_user_unique(None, &user.username, &user.email)?;

        let principal = Principal {
            id: UserId::new(inner.next_id()),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            date_joined: crate::now_millis(),
        };
        inner.users.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<Principal>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<Principal>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<Principal>> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<Principal> {
        let mut inner = self.write()?;
        let mut user = inner
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;

        if let Some(username) = &patch.username {
            user.username = username.clone();
        }
        if let Some(email) = &patch.email {
            user.email = email.clone();
        }
        if let Some(first_name) = &patch.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &patch.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(is_active) = patch.is_active {
            user.is_active = is_active;
        }

        inner.check_user_unique(Some(id), &user.username, &user.email)?;
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<()> {
        let mut inner = self.write()?;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.users.remove(&id).is_none() {
            return Ok(false);
        }
        inner.assignments.retain(|_, a| a.user_id != id);
        Ok(true)
    }

    async fn insert_permission(&self, perm: &NewPermission) -> Result<Permission> {
        let mut inner = self.write()?;
        inner.check_permission_unique(None, &perm.codename, &perm.name)?;

        let permission = Permission {
            id: PermissionId::new(inner.next_id()),
            codename: perm.codename.clone(),
            name: perm.name.clone(),
            description: perm.description.clone(),
        };
        inner.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        Ok(self.read()?.permissions.get(&id).cloned())
    }

    async fn get_permission_by_codename(&self, codename: &Codename) -> Result<Option<Permission>> {
        Ok(self.read()?.permission_by_codename(codename).cloned())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>> {
        Ok(self.read()?.permissions.values().cloned().collect())
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        patch: &PermissionPatch,
    ) -> Result<Permission> {
        let mut inner = self.write()?;
        let mut perm = inner
            .permissions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("permission {id}")))?;

        if let Some(codename) = &patch.codename {
            perm.codename = codename.clone();
        }
        if let Some(name) = &patch.name {
            perm.name = name.clone();
        }
        if let Some(description) = &patch.description {
            perm.description = description.clone();
        }

        inner.check_permission_unique(Some(id), &perm.codename, &perm.name)?;
        inner.permissions.insert(id, perm.clone());
        Ok(perm)
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.permissions.remove(&id).is_none() {
            return Ok(false);
        }
        inner.grants.retain(|_, g| g.permission_id != id);
        Ok(true)
    }

    async fn apply_permission_seed(
        &self,
        seed: &PermissionSeed,
        run_stamp: i64,
    ) -> Result<SeedOutcome> {
        let mut inner = self.write()?;

        let plan = plan_permission_seed(
            seed,
            inner.permission_by_codename(&seed.codename),
            inner.permission_by_name(&seed.name),
            run_stamp,
        );

        match plan {
            SeedPlan::Update {
                id,
                name,
                description,
                name_kept,
            } => {
                inner.check_permission_unique(Some(id), &seed.codename, &name)?;
                if let Some(perm) = inner.permissions.get_mut(&id) {
                    perm.name = name;
                    perm.description = description;
                }
                Ok(SeedOutcome::Updated { id, name_kept })
            }
            SeedPlan::Create {
                name,
                description,
                disambiguated,
            } => {
                inner.check_permission_unique(None, &seed.codename, &name)?;
                let id = PermissionId::new(inner.next_id());
                inner.permissions.insert(
                    id,
                    Permission {
                        id,
                        codename: seed.codename.clone(),
                        name: name.clone(),
                        description,
                    },
                );
                Ok(SeedOutcome::Created {
                    id,
                    name,
                    disambiguated,
                })
            }
        }
    }

    async fn insert_role(&self, role: &NewRole) -> Result<Role> {
        let mut inner = self.write()?;
        inner.check_role_unique(None, &role.name)?;

        let role = Role {
            id: RoleId::new(inner.next_id()),
            name: role.name.clone(),
            description: role.description.clone(),
        };
        inner.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        Ok(self
            .read()?
            .roles
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.read()?.roles.values().cloned().collect())
    }

    async fn update_role(&self, id: RoleId, patch: &RolePatch) -> Result<Role> {
        let mut inner = self.write()?;
        let mut role = inner
            .roles
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("role {id}")))?;

        if let Some(name) = &patch.name {
            role.name = name.clone();
        }
        if let Some(description) = &patch.description {
            role.description = description.clone();
        }

        inner.check_role_unique(Some(id), &role.name)?;
        inner.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.roles.remove(&id).is_none() {
            return Ok(false);
        }
        inner.grants.retain(|_, g| g.role_id != id);
        inner.assignments.retain(|_, a| a.role_id != id);
        Ok(true)
    }

    async fn grant_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<InsertResult<GrantId>> {
        let mut inner = self.write()?;
        if !inner.roles.contains_key(&role) || !inner.permissions.contains_key(&permission) {
            return Err(StoreError::NotFound("referenced row".into()));
        }

        if let Some(existing) = inner
            .grants
            .values()
            .find(|g| g.role_id == role && g.permission_id == permission)
        {
            return Ok(InsertResult::AlreadyExists(existing.id));
        }

        let id = GrantId::new(inner.next_id());
        inner.grants.insert(
            id,
            RoleGrant {
                id,
                role_id: role,
                permission_id: permission,
            },
        );
        Ok(InsertResult::Inserted(id))
    }

    async fn revoke_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool> {
        let mut inner = self.write()?;
        let before = inner.grants.len();
        inner
            .grants
            .retain(|_, g| !(g.role_id == role && g.permission_id == permission));
        Ok(inner.grants.len() < before)
    }

    async fn list_grants(&self, role: Option<RoleId>) -> Result<Vec<GrantDetail>> {
        let inner = self.read()?;
        let grants = inner
            .grants
            .values()
            .filter(|g| role.map_or(true, |r| g.role_id == r))
            .filter_map(|g| {
                let role = inner.roles.get(&g.role_id)?;
                let perm = inner.permissions.get(&g.permission_id)?;
                Some(GrantDetail {
                    grant: *g,
                    role_name: role.name.clone(),
                    permission_name: perm.name.clone(),
                    codename: perm.codename.clone(),
                })
            })
            .collect();
        Ok(grants)
    }

    async fn assign_role(&self, user: UserId, role: RoleId) -> Result<InsertResult<AssignmentId>> {
        let mut inner = self.write()?;
        if !inner.users.contains_key(&user) || !inner.roles.contains_key(&role) {
            return Err(StoreError::NotFound("referenced row".into()));
        }

        if let Some(existing) = inner
            .assignments
            .values()
            .find(|a| a.user_id == user && a.role_id == role)
        {
            return Ok(InsertResult::AlreadyExists(existing.id));
        }

        let id = AssignmentId::new(inner.next_id());
        inner.assignments.insert(
            id,
            Assignment {
                id,
                user_id: user,
                role_id: role,
            },
        );
        Ok(InsertResult::Inserted(id))
    }

    async fn unassign_role(&self, user: UserId, role: RoleId) -> Result<bool> {
        let mut inner = self.write()?;
        let before = inner.assignments.len();
        inner
            .assignments
            .retain(|_, a| !(a.user_id == user && a.role_id == role));
        Ok(inner.assignments.len() < before)
    }

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>> {
        Ok(self.read()?.assignments.get(&id).copied())
    }

    async fn list_assignments(&self, user: Option<UserId>) -> Result<Vec<AssignmentDetail>> {
        let inner = self.read()?;
        let assignments = inner
            .assignments
            .values()
            .filter(|a| user.map_or(true, |u| a.user_id == u))
            .filter_map(|a| {
                let principal = inner.users.get(&a.user_id)?;
                let role = inner.roles.get(&a.role_id)?;
                Some(AssignmentDetail {
                    assignment: *a,
                    username: principal.username.clone(),
                    role_name: role.name.clone(),
                })
            })
            .collect();
        Ok(assignments)
    }

    async fn role_ids_for_user(&self, user: UserId) -> Result<Vec<RoleId>> {
        Ok(self.read()?.role_ids_for(user).into_iter().collect())
    }

    async fn has_permission(&self, user: UserId, codename: &Codename) -> Result<bool> {
        let inner = self.read()?;
        let Some(perm) = inner.permission_by_codename(codename) else {
            return Ok(false);
        };
        let roles = inner.role_ids_for(user);
        Ok(inner
            .grants
            .values()
            .any(|g| g.permission_id == perm.id && roles.contains(&g.role_id)))
    }

    async fn codenames_for_user(&self, user: UserId) -> Result<Vec<Codename>> {
        let inner = self.read()?;
        let roles = inner.role_ids_for(user);
        let codenames: BTreeSet<Codename> = inner
            .grants
            .values()
            .filter(|g| roles.contains(&g.role_id))
            .filter_map(|g| inner.permissions.get(&g.permission_id))
            .map(|p| p.codename.clone())
            .collect();
        Ok(codenames.into_iter().collect())
    }

    async fn counts(&self) -> Result<TableCounts> {
        let inner = self.read()?;
        Ok(TableCounts {
            users: inner.users.len() as u64,
            permissions: inner.permissions.len() as u64,
            roles: inner.roles.len() as u64,
            grants: inner.grants.len() as u64,
            assignments: inner.assignments.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(username: &str) -> NewPrincipal {
        NewPrincipal {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.insert_user(&principal("a")).await.unwrap();

        let mut dup = principal("b");
        dup.email = "a@example.com".into();
        let err = store.insert_user(&dup).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref field } if field == "email"));
    }

    #[tokio::test]
    async fn test_assignment_idempotent_and_cascade() {
        let store = MemoryStore::new();
        let user = store.insert_user(&principal("a")).await.unwrap();
        let role = store.insert_role(&NewRole::new("viewer", "")).await.unwrap();

        let first = store.assign_role(user.id, role.id).await.unwrap();
        let second = store.assign_role(user.id, role.id).await.unwrap();
        assert_eq!(second, InsertResult::AlreadyExists(first.id()));
        assert_eq!(store.role_ids_for_user(user.id).await.unwrap(), vec![role.id]);

        store.delete_role(role.id).await.unwrap();
        assert!(store.role_ids_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_missing_user_not_found() {
        let store = MemoryStore::new();
        let role = store.insert_role(&NewRole::new("viewer", "")).await.unwrap();
        let err = store.assign_role(UserId::new(42), role.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_user_keeps_uniqueness() {
        let store = MemoryStore::new();
        store.insert_user(&principal("a")).await.unwrap();
        let b = store.insert_user(&principal("b")).await.unwrap();

        let patch = UserPatch {
            username: Some("a".into()),
            ..UserPatch::default()
        };
        assert!(store.update_user(b.id, &patch).await.unwrap_err().is_conflict());
        assert_eq!(store.get_user(b.id).await.unwrap().unwrap().username, "b");
    }

    #[tokio::test]
    async fn test_unassign_and_revoke_report_presence() {
        let store = MemoryStore::new();
        let user = store.insert_user(&principal("a")).await.unwrap();
        let role = store.insert_role(&NewRole::new("viewer", "")).await.unwrap();
        let perm = store
            .insert_permission(&NewPermission {
                codename: Codename::new("role_view").unwrap(),
                name: "查看角色".into(),
                description: String::new(),
            })
            .await
            .unwrap();

        store.grant_permission(role.id, perm.id).await.unwrap();
        store.assign_role(user.id, role.id).await.unwrap();

        assert!(store.revoke_permission(role.id, perm.id).await.unwrap());
        assert!(!store.revoke_permission(role.id, perm.id).await.unwrap());
        assert!(store.unassign_role(user.id, role.id).await.unwrap());
        assert!(!store.unassign_role(user.id, role.id).await.unwrap());
    }
}
