//! Declarations for the guarded administrative operations.
//!
//! Each handler of the admin surface maps to one [`Operation`]; its
//! [`Access`] is fixed here and read by the enforcer at dispatch time.

use std::fmt;

use rolegate_core::Codename;

use crate::enforce::OperationPolicy;

/// How an operation is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Anyone, authenticated or not.
    Public,
    /// Subject to the enforcement wrapper.
    Guarded(OperationPolicy),
}

/// Every dispatchable administrative operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    UserCreate,
    UserList,
    UserRetrieve,
    UserUpdate,
    UserPartialUpdate,
    UserDestroy,
    UserChangePassword,

    RoleList,
    RoleCreate,
    RoleRetrieve,
    RoleUpdate,
    RolePartialUpdate,
    RoleDestroy,

    PermissionList,
    PermissionCreate,
    PermissionRetrieve,
    PermissionUpdate,
    PermissionPartialUpdate,
    PermissionDestroy,

    RolePermissionList,
    RolePermissionCreate,
    RolePermissionRetrieve,
    RolePermissionUpdate,
    RolePermissionPartialUpdate,
    RolePermissionDestroy,

    UserRoleList,
    UserRoleCreate,
    UserRoleRetrieve,
    UserRoleUpdate,
    UserRolePartialUpdate,
    UserRoleDestroy,
}

impl Operation {
    pub const ALL: [Operation; 32] = [
        Operation::Login,
        Operation::UserCreate,
        Operation::UserList,
        Operation::UserRetrieve,
        Operation::UserUpdate,
        Operation::UserPartialUpdate,
        Operation::UserDestroy,
        Operation::UserChangePassword,
        Operation::RoleList,
        Operation::RoleCreate,
        Operation::RoleRetrieve,
        Operation::RoleUpdate,
        Operation::RolePartialUpdate,
        Operation::RoleDestroy,
        Operation::PermissionList,
        Operation::PermissionCreate,
        Operation::PermissionRetrieve,
        Operation::PermissionUpdate,
        Operation::PermissionPartialUpdate,
        Operation::PermissionDestroy,
        Operation::RolePermissionList,
        Operation::RolePermissionCreate,
        Operation::RolePermissionRetrieve,
        Operation::RolePermissionUpdate,
        Operation::RolePermissionPartialUpdate,
        Operation::RolePermissionDestroy,
        Operation::UserRoleList,
        Operation::UserRoleCreate,
        Operation::UserRoleRetrieve,
        Operation::UserRoleUpdate,
        Operation::UserRolePartialUpdate,
        Operation::UserRoleDestroy,
    ];

    /// Stable snake_case name, e.g. `role_permission_destroy`.
    pub fn name(self) -> &'static str {
        use Operation::*;
        match self {
            Login => "login",
            UserCreate => "user_create",
            UserList => "user_list",
            UserRetrieve => "user_retrieve",
            UserUpdate => "user_update",
            UserPartialUpdate => "user_partial_update",
            UserDestroy => "user_destroy",
            UserChangePassword => "user_change_password",
            RoleList => "role_list",
            RoleCreate => "role_create",
            RoleRetrieve => "role_retrieve",
            RoleUpdate => "role_update",
            RolePartialUpdate => "role_partial_update",
            RoleDestroy => "role_destroy",
            PermissionList => "permission_list",
            PermissionCreate => "permission_create",
            PermissionRetrieve => "permission_retrieve",
            PermissionUpdate => "permission_update",
            PermissionPartialUpdate => "permission_partial_update",
            PermissionDestroy => "permission_destroy",
            RolePermissionList => "role_permission_list",
            RolePermissionCreate => "role_permission_create",
            RolePermissionRetrieve => "role_permission_retrieve",
            RolePermissionUpdate => "role_permission_update",
            RolePermissionPartialUpdate => "role_permission_partial_update",
            RolePermissionDestroy => "role_permission_destroy",
            UserRoleList => "user_role_list",
            UserRoleCreate => "user_role_create",
            UserRoleRetrieve => "user_role_retrieve",
            UserRoleUpdate => "user_role_update",
            UserRolePartialUpdate => "user_role_partial_update",
            UserRoleDestroy => "user_role_destroy",
        }
    }

    /// The declared access rule for this operation.
    pub fn access(self) -> Access {
        use Operation::*;
        let perm = |raw: &'static str| {
            Access::Guarded(OperationPolicy::permission(Codename::from_static(raw)))
        };
        let own = |raw: &'static str| {
            Access::Guarded(OperationPolicy::owner_with(Codename::from_static(raw)))
        };

        match self {
            Login | UserCreate => Access::Public,

            UserList => perm("user_view"),
            UserRetrieve => own("user_view"),
            UserUpdate | UserPartialUpdate => own("user_update"),
            UserDestroy => perm("user_delete"),
            UserChangePassword => own("user_change_password"),

            RoleList | RoleRetrieve => perm("role_view"),
            RoleCreate => perm("role_create"),
            RoleUpdate | RolePartialUpdate => perm("role_update"),
            RoleDestroy => perm("role_delete"),

            PermissionList | PermissionRetrieve => perm("permission_view"),
            PermissionCreate => perm("permission_create"),
            PermissionUpdate | PermissionPartialUpdate => perm("permission_update"),
            PermissionDestroy => perm("permission_delete"),

            RolePermissionList | RolePermissionRetrieve => perm("role_permission_view"),
            RolePermissionCreate => perm("role_permission_create"),
            RolePermissionUpdate | RolePermissionPartialUpdate => perm("role_permission_update"),
            RolePermissionDestroy => perm("role_permission_delete"),

            UserRoleList | UserRoleRetrieve => perm("user_role_view"),
            UserRoleCreate => perm("user_role_create"),
            UserRoleUpdate | UserRolePartialUpdate => perm("user_role_update"),
            UserRoleDestroy => perm("user_role_delete"),
        }
    }

    /// The required codename, if the operation declares one.
    pub fn codename(self) -> Option<Codename> {
        match self.access() {
            Access::Public => None,
            Access::Guarded(policy) => policy.permission,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_only_login_and_registration_are_public() {
        let public: Vec<_> = Operation::ALL
            .iter()
            .filter(|op| op.access() == Access::Public)
            .collect();
        assert_eq!(public, vec![&Operation::Login, &Operation::UserCreate]);
    }

    #[test]
    fn test_self_scoped_user_operations() {
        for op in [
            Operation::UserRetrieve,
            Operation::UserUpdate,
            Operation::UserPartialUpdate,
            Operation::UserChangePassword,
        ] {
            match op.access() {
                Access::Guarded(policy) => assert!(policy.ownership, "{op} must check ownership"),
                Access::Public => panic!("{op} must be guarded"),
            }
        }
        match Operation::UserDestroy.access() {
            Access::Guarded(policy) => assert!(!policy.ownership),
            Access::Public => panic!("user_destroy must be guarded"),
        }
    }

    #[test]
    fn test_declared_codenames_are_valid() {
        for op in Operation::ALL {
            if let Some(codename) = op.codename() {
                assert!(Codename::new(codename.as_str()).is_ok());
            }
        }
    }

    #[test]
    fn test_names_unique() {
        let names: HashSet<_> = Operation::ALL.iter().map(|op| op.name()).collect();
        assert_eq!(names.len(), Operation::ALL.len());
    }

    #[test]
    fn test_codename_mapping() {
        assert_eq!(
            Operation::RolePermissionPartialUpdate.codename().unwrap().as_str(),
            "role_permission_update"
        );
        assert_eq!(Operation::UserRetrieve.codename().unwrap().as_str(), "user_view");
        assert_eq!(Operation::Login.codename(), None);
    }
}
