//! Ownership guard for self-scoped resources.

use rolegate_core::{Assignment, Principal, UserId};

use crate::decision::Decision;

/// Who a resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerRef {
    /// The resource carries an owner field pointing at this user.
    User(UserId),
    /// The resource is itself the account of this user.
    Account(UserId),
    /// The resource has no owner.
    None,
}

/// A resource that can be checked for ownership.
pub trait Owned {
    fn owner(&self) -> OwnerRef;
}

impl Owned for Principal {
    fn owner(&self) -> OwnerRef {
        OwnerRef::Account(self.id)
    }
}

impl Owned for Assignment {
    fn owner(&self) -> OwnerRef {
        OwnerRef::User(self.user_id)
    }
}

/// Decide whether `principal` may act on `target` as its owner.
///
/// Superusers always pass. Resources without an owner pass for nobody else.
pub fn check_ownership(principal: &Principal, target: &dyn Owned) -> Decision {
    if principal.is_superuser {
        return Decision::Granted;
    }
    match target.owner() {
        OwnerRef::User(owner) | OwnerRef::Account(owner) => Decision::from(owner == principal.id),
        OwnerRef::None => Decision::Denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegate_core::{AssignmentId, RoleId};

    fn principal(id: i64, superuser: bool) -> Principal {
        Principal {
            id: UserId::new(id),
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            is_staff: superuser,
            is_superuser: superuser,
            date_joined: 0,
        }
    }

    struct Orphan;

    impl Owned for Orphan {
        fn owner(&self) -> OwnerRef {
            OwnerRef::None
        }
    }

    #[test]
    fn test_self_account_allowed() {
        let u = principal(1, false);
        assert_eq!(check_ownership(&u, &u), Decision::Granted);
    }

    #[test]
    fn test_other_account_denied() {
        let u = principal(1, false);
        let v = principal(2, false);
        assert_eq!(check_ownership(&v, &u), Decision::Denied);
    }

    #[test]
    fn test_owner_field() {
        let assignment = Assignment {
            id: AssignmentId::new(10),
            user_id: UserId::new(1),
            role_id: RoleId::new(3),
        };
        assert!(check_ownership(&principal(1, false), &assignment).is_granted());
        assert!(!check_ownership(&principal(2, false), &assignment).is_granted());
    }

    #[test]
    fn test_id_coincidence_is_not_ownership() {
        // Assignment 1 belongs to user 2; user 1 shares only the numeric id.
        let assignment = Assignment {
            id: AssignmentId::new(1),
            user_id: UserId::new(2),
            role_id: RoleId::new(3),
        };
        assert_eq!(check_ownership(&principal(1, false), &assignment), Decision::Denied);
    }

    #[test]
    fn test_unowned_resource() {
        assert_eq!(check_ownership(&principal(1, false), &Orphan), Decision::Denied);
        assert_eq!(check_ownership(&principal(1, true), &Orphan), Decision::Granted);
    }
}
