//! Catalog seed resolution.
//!
//! Seeding matches existing catalog rows by codename, never by display name.
//! This module holds the pure decision; stores apply it atomically per entry
//! so that concurrent seed runs converge on the same rows.

use serde::{Deserialize, Serialize};

use crate::codename::Codename;
use crate::model::Permission;
use crate::types::PermissionId;

/// One declarative catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSeed {
    pub codename: Codename,
    pub name: String,
    pub description: String,
}

impl PermissionSeed {
    pub fn new(codename: Codename, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            codename,
            name: name.into(),
            description: description.into(),
        }
    }
}

/// What to do with a seed entry given the current catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedPlan {
    /// Update the row that already owns the codename.
    Update {
        id: PermissionId,
        name: String,
        description: String,
        /// The seed's display name belongs to another permission; the old
        /// name was kept.
        name_kept: bool,
    },
    /// Insert a new row.
    Create {
        name: String,
        description: String,
        /// The seed's display name was taken and got a run-stamp suffix.
        disambiguated: bool,
    },
}

/// Result of applying one seed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Created {
        id: PermissionId,
        name: String,
        disambiguated: bool,
    },
    Updated {
        id: PermissionId,
        name_kept: bool,
    },
}

/// Decide how to apply `seed`.
///
/// - `by_codename`: the permission currently holding `seed.codename`.
/// - `by_name`: the permission currently holding `seed.name` as display name.
/// - `run_stamp`: the seed run's Unix timestamp in seconds.
pub fn plan_permission_seed(
    seed: &PermissionSeed,
    by_codename: Option<&Permission>,
    by_name: Option<&Permission>,
    run_stamp: i64,
) -> SeedPlan {
    match by_codename {
        Some(existing) => {
            let taken_elsewhere = by_name.is_some_and(|holder| holder.id != existing.id);
            let name = if taken_elsewhere {
                existing.name.clone()
            } else {
                seed.name.clone()
            };
            SeedPlan::Update {
                id: existing.id,
                name,
                description: seed.description.clone(),
                name_kept: taken_elsewhere,
            }
        }
        None => match by_name {
            Some(_) => SeedPlan::Create {
                name: disambiguated_name(&seed.name, run_stamp),
                description: seed.description.clone(),
                disambiguated: true,
            },
            None => SeedPlan::Create {
                name: seed.name.clone(),
                description: seed.description.clone(),
                disambiguated: false,
            },
        },
    }
}

/// `"{name}_{stamp}"`.
pub fn disambiguated_name(name: &str, run_stamp: i64) -> String {
    format!("{name}_{run_stamp}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(id: i64, codename: &str, name: &str) -> Permission {
        Permission {
            id: PermissionId::new(id),
            codename: Codename::new(codename).unwrap(),
            name: name.into(),
            description: String::new(),
        }
    }

    fn seed(codename: &str, name: &str, description: &str) -> PermissionSeed {
        PermissionSeed::new(Codename::new(codename).unwrap(), name, description)
    }

    #[test]
    fn test_fresh_entry_is_created() {
        let plan = plan_permission_seed(&seed("user_view", "查看用户", "d"), None, None, 100);
        assert_eq!(
            plan,
            SeedPlan::Create {
                name: "查看用户".into(),
                description: "d".into(),
                disambiguated: false,
            }
        );
    }

    #[test]
    fn test_existing_codename_updates_in_place() {
        let existing = perm(1, "user_view", "查看用户");
        let plan = plan_permission_seed(
            &seed("user_view", "查看用户", "new text"),
            Some(&existing),
            Some(&existing),
            100,
        );
        assert_eq!(
            plan,
            SeedPlan::Update {
                id: PermissionId::new(1),
                name: "查看用户".into(),
                description: "new text".into(),
                name_kept: false,
            }
        );
    }

    #[test]
    fn test_rename_blocked_by_other_holder_keeps_old_name() {
        let existing = perm(1, "view_user", "旧名称");
        let holder = perm(2, "user_view", "查看用户");
        let plan = plan_permission_seed(
            &seed("view_user", "查看用户", "d"),
            Some(&existing),
            Some(&holder),
            100,
        );
        assert!(matches!(
            plan,
            SeedPlan::Update { ref name, name_kept: true, .. } if name == "旧名称"
        ));
    }

    #[test]
    fn test_rename_when_name_is_free() {
        let existing = perm(1, "user_view", "旧名称");
        let plan = plan_permission_seed(&seed("user_view", "查看用户", "d"), Some(&existing), None, 100);
        assert!(matches!(
            plan,
            SeedPlan::Update { ref name, name_kept: false, .. } if name == "查看用户"
        ));
    }

    #[test]
    fn test_new_codename_with_taken_name_is_suffixed() {
        let holder = perm(2, "view_user", "查看用户");
        let plan = plan_permission_seed(&seed("user_view", "查看用户", "d"), None, Some(&holder), 1700000000);
        assert!(matches!(
            plan,
            SeedPlan::Create { ref name, disambiguated: true, .. } if name == "查看用户_1700000000"
        ));
    }
}
