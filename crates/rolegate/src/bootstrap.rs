//! Catalog bootstrap.
//!
//! Seeds the permission catalog, the two baseline roles and their grants,
//! and optionally a set of default accounts. Every step is idempotent and
//! each catalog entry is applied atomically by the store, so repeated or
//! concurrent runs converge on the same rows.

use serde::Serialize;
use tracing::{info, warn};

use rolegate_core::{Codename, NewRole, NewUser, PermissionSeed, Role, SeedOutcome};
use rolegate_store::Store;

use crate::config::AccountSeed;
use crate::error::{GateError, Result};
use crate::gate::Gate;

/// Administrator role, granted the whole catalog.
pub const ADMIN_ROLE: &str = "管理员";
const ADMIN_ROLE_DESCRIPTION: &str = "系统管理员，拥有所有权限";

/// Regular-user role, granted the `*_view` subset.
pub const USER_ROLE: &str = "普通用户";
const USER_ROLE_DESCRIPTION: &str = "普通用户，拥有基本权限";

/// `(codename, display name, description)` of every built-in permission.
const CATALOG: &[(&str, &str, &str)] = &[
    ("user_view", "查看用户", "查看用户列表和详情"),
    ("user_create", "创建用户", "创建新用户"),
    ("user_update", "更新用户", "更新用户信息"),
    ("user_delete", "删除用户", "删除用户"),
    ("user_change_password", "修改用户密码", "修改用户密码"),
    ("role_view", "查看角色", "查看角色列表和详情"),
    ("role_create", "创建角色", "创建新角色"),
    ("role_update", "更新角色", "更新角色信息"),
    ("role_delete", "删除角色", "删除角色"),
    ("permission_view", "查看权限", "查看权限列表和详情"),
    ("permission_create", "创建权限", "创建新权限"),
    ("permission_update", "更新权限", "更新权限信息"),
    ("permission_delete", "删除权限", "删除权限"),
    ("role_permission_view", "查看角色权限", "查看角色权限关联"),
    ("role_permission_create", "创建角色权限", "创建角色权限关联"),
    ("role_permission_update", "更新角色权限", "更新角色权限关联"),
    ("role_permission_delete", "删除角色权限", "删除角色权限关联"),
    ("user_role_view", "查看用户角色", "查看用户角色关联"),
    ("user_role_create", "创建用户角色", "创建用户角色关联"),
    ("user_role_update", "更新用户角色", "更新用户角色关联"),
    ("user_role_delete", "删除用户角色", "删除用户角色关联"),
    // Coarse codenames kept for older clients.
    ("user_management", "用户管理", "管理用户"),
    ("role_management", "角色管理", "管理角色"),
    ("permission_management", "权限管理", "管理权限"),
    ("role_permission_management", "角色权限管理", "管理角色权限关联"),
    ("user_role_management", "用户角色管理", "管理用户角色关联"),
];

/// The built-in permission catalog, in seeding order.
pub fn builtin_catalog() -> Vec<PermissionSeed> {
    CATALOG
        .iter()
        .map(|&(codename, name, description)| {
            PermissionSeed::new(Codename::from_static(codename), name, description)
        })
        .collect()
}

/// Counts from one bootstrap run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    /// Catalog entries inserted.
    pub created: u32,
    /// Catalog entries that already existed and were refreshed.
    pub updated: u32,
    /// Entries that failed and were left for the next run.
    pub skipped: u32,
    pub roles_created: u32,
    pub grants_created: u32,
    pub assignments_created: u32,
    pub accounts_created: u32,
}

impl<S: Store> Gate<S> {
    /// Bootstrap the built-in catalog, stamped with the current time.
    pub async fn bootstrap(&self) -> Result<BootstrapReport> {
        self.bootstrap_with(&builtin_catalog(), unix_seconds()).await
    }

    /// Bootstrap an explicit catalog.
    ///
    /// `run_stamp` suffixes display names that collide with a different
    /// permission. Only failure to set up the baseline roles aborts the run;
    /// a failing catalog entry, grant or account is counted in `skipped`.
    pub async fn bootstrap_with(
        &self,
        catalog: &[PermissionSeed],
        run_stamp: i64,
    ) -> Result<BootstrapReport> {
        let mut report = BootstrapReport::default();
        info!(entries = catalog.len(), run_stamp, "bootstrap started");

        for seed in catalog {
            self.apply_seed(seed, run_stamp, &mut report).await;
        }

        let admin_role = self
            .ensure_role(ADMIN_ROLE, ADMIN_ROLE_DESCRIPTION, &mut report)
            .await?;
        let user_role = self
            .ensure_role(USER_ROLE, USER_ROLE_DESCRIPTION, &mut report)
            .await?;

        self.grant_catalog(catalog, &admin_role, &user_role, &mut report)
            .await;

        for account in &self.config().bootstrap.accounts {
            let role = if account.superuser {
                &admin_role
            } else {
                &user_role
            };
            if let Err(e) = self.ensure_account(account, role, &mut report).await {
                warn!(username = %account.username, error = %e, "default account skipped");
                report.skipped += 1;
            }
        }

        info!(?report, "bootstrap finished");
        Ok(report)
    }

    async fn apply_seed(&self, seed: &PermissionSeed, run_stamp: i64, report: &mut BootstrapReport) {
        match self.store().apply_permission_seed(seed, run_stamp).await {
            Ok(SeedOutcome::Created {
                name,
                disambiguated,
                ..
            }) => {
                if disambiguated {
                    warn!(
                        codename = %seed.codename,
                        %name,
                        "display name taken, created under unique name"
                    );
                }
                report.created += 1;
            }
            Ok(SeedOutcome::Updated { name_kept, .. }) => {
                if name_kept {
                    warn!(
                        codename = %seed.codename,
                        wanted = %seed.name,
                        "display name taken, kept previous name"
                    );
                }
                report.updated += 1;
            }
            Err(e) => {
                warn!(codename = %seed.codename, error = %e, "catalog entry skipped");
                report.skipped += 1;
            }
        }
    }

    /// Grant every catalog codename to the admin role and the `*_view` subset
    /// to the user role. A failing entry is logged and skipped.
    async fn grant_catalog(
        &self,
        catalog: &[PermissionSeed],
        admin_role: &Role,
        user_role: &Role,
        report: &mut BootstrapReport,
    ) {
        for seed in catalog {
            if let Err(e) = self.grant_seed(seed, admin_role, user_role, report).await {
                warn!(codename = %seed.codename, error = %e, "grant skipped");
                report.skipped += 1;
            }
        }
    }

    async fn grant_seed(
        &self,
        seed: &PermissionSeed,
        admin_role: &Role,
        user_role: &Role,
        report: &mut BootstrapReport,
    ) -> Result<()> {
        let Some(perm) = self.store().get_permission_by_codename(&seed.codename).await? else {
            // Its seed failed above and was already counted.
            return Ok(());
        };
        if self
            .store()
            .grant_permission(admin_role.id, perm.id)
            .await?
            .is_inserted()
        {
            report.grants_created += 1;
        }
        if perm.codename.is_view()
            && self
                .store()
                .grant_permission(user_role.id, perm.id)
                .await?
                .is_inserted()
        {
            report.grants_created += 1;
        }
        Ok(())
    }

    /// Get or create a role by name, tolerating a concurrent creator.
    async fn ensure_role(
        &self,
        name: &str,
        description: &str,
        report: &mut BootstrapReport,
    ) -> Result<Role> {
        if let Some(role) = self.store().get_role_by_name(name).await? {
            return Ok(role);
        }
        match self.store().insert_role(&NewRole::new(name, description)).await {
            Ok(role) => {
                report.roles_created += 1;
                Ok(role)
            }
            Err(e) if e.is_conflict() => self
                .store()
                .get_role_by_name(name)
                .await?
                .ok_or_else(|| GateError::NotFound(format!("role {name}"))),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_account(
        &self,
        account: &AccountSeed,
        role: &Role,
        report: &mut BootstrapReport,
    ) -> Result<()> {
        let existing = self.store().get_user_by_username(&account.username).await?;
        let user = match existing {
            Some(user) => user,
            None => {
                let new_user = NewUser::new(&account.username, &account.email, &account.password);
                match self.create_account(new_user, account.superuser).await {
                    Ok(user) => {
                        report.accounts_created += 1;
                        user
                    }
                    // Lost a race with a concurrent run creating the same account.
                    Err(GateError::Validation(v))
                        if v.has_field("username") || v.has_field("email") =>
                    {
                        self.store()
                            .get_user_by_username(&account.username)
                            .await?
                            .ok_or(GateError::Validation(v))?
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        if self.store().assign_role(user.id, role.id).await?.is_inserted() {
            report.assignments_created += 1;
        }
        Ok(())
    }
}

fn unix_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use rolegate_core::RoleId;
    use rolegate_store::MemoryStore;

    use crate::config::GateConfig;

    #[test]
    fn test_catalog_is_well_formed() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.len(), 26);

        let codenames: HashSet<_> = catalog.iter().map(|s| s.codename.clone()).collect();
        let names: HashSet<_> = catalog.iter().map(|s| s.name.clone()).collect();
        assert_eq!(codenames.len(), catalog.len());
        assert_eq!(names.len(), catalog.len());

        for seed in &catalog {
            assert!(Codename::new(seed.codename.as_str()).is_ok());
            assert!(seed.name.chars().count() <= 50);
        }
    }

    #[test]
    fn test_view_subset() {
        let views: Vec<_> = builtin_catalog()
            .into_iter()
            .filter(|s| s.codename.is_view())
            .map(|s| s.codename.to_string())
            .collect();
        assert_eq!(
            views,
            vec![
                "user_view",
                "role_view",
                "permission_view",
                "role_permission_view",
                "user_role_view"
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_grant_is_skipped_and_wiring_continues() {
        let gate = Gate::new(MemoryStore::new(), GateConfig::for_tests());
        let catalog = builtin_catalog();
        let mut report = BootstrapReport::default();
        for seed in &catalog {
            gate.apply_seed(seed, 1, &mut report).await;
        }
        let admin = gate
            .ensure_role(ADMIN_ROLE, ADMIN_ROLE_DESCRIPTION, &mut report)
            .await
            .unwrap();
        // A role row removed underneath the run makes every view grant fail.
        let missing = Role {
            id: RoleId::new(9_999),
            name: USER_ROLE.into(),
            description: String::new(),
        };

        gate.grant_catalog(&catalog, &admin, &missing, &mut report)
            .await;

        let views = catalog.iter().filter(|s| s.codename.is_view()).count() as u32;
        assert_eq!(report.skipped, views);
        assert_eq!(report.grants_created, catalog.len() as u32);
        let granted = gate.store().list_grants(Some(admin.id)).await.unwrap();
        assert_eq!(granted.len(), catalog.len());
    }
}
