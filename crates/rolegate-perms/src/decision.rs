//! The access decision engine.
//!
//! A decision is a pure existence query: a principal holds a codename iff
//! one of its assigned roles is granted the permission with that codename.
//! Roles are flat; there is no inheritance between them.

use std::sync::Arc;

use rolegate_core::{Codename, Principal};
use rolegate_store::Store;
use tracing::debug;

use crate::error::Result;

/// Outcome of an authorization or ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted,
    Denied,
}

impl Decision {
    pub fn is_granted(self) -> bool {
        self == Decision::Granted
    }
}

impl From<bool> for Decision {
    fn from(granted: bool) -> Self {
        if granted {
            Decision::Granted
        } else {
            Decision::Denied
        }
    }
}

/// Answers "may this principal do X" against the shared store.
///
/// Stateless and read-only: no cache is kept, so every decision reflects
/// the current grant and assignment rows.
pub struct DecisionEngine<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for DecisionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> DecisionEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decide whether `principal` holds `codename`.
    ///
    /// Superusers are granted without touching the store, even when no
    /// codename is supplied. For everyone else an absent codename is denied.
    /// A codename missing from the catalog is simply denied.
    pub async fn authorize(
        &self,
        principal: &Principal,
        codename: Option<&Codename>,
    ) -> Result<Decision> {
        if principal.is_superuser {
            debug!(user = %principal.id, "superuser bypass");
            return Ok(Decision::Granted);
        }

        let Some(codename) = codename else {
            debug!(user = %principal.id, "no codename declared, denying");
            return Ok(Decision::Denied);
        };

        let decision = Decision::from(self.store.has_permission(principal.id, codename).await?);
        debug!(user = %principal.id, %codename, ?decision, "authorize");
        Ok(decision)
    }

    /// Every codename the principal currently holds, sorted.
    ///
    /// Superusers hold the whole catalog.
    pub async fn effective_codenames(&self, principal: &Principal) -> Result<Vec<Codename>> {
        if principal.is_superuser {
            let mut all: Vec<Codename> = self
                .store
                .list_permissions()
                .await?
                .into_iter()
                .map(|p| p.codename)
                .collect();
            all.sort();
            return Ok(all);
        }
        Ok(self.store.codenames_for_user(principal.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegate_core::{NewPermission, NewPrincipal, NewRole};
    use rolegate_store::MemoryStore;

    async fn principal(store: &MemoryStore, username: &str, superuser: bool) -> Principal {
        store
            .insert_user(&NewPrincipal {
                username: username.into(),
                email: format!("{username}@example.com"),
                password_hash: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                is_active: true,
                is_staff: superuser,
                is_superuser: superuser,
            })
            .await
            .unwrap()
    }

    fn codename(raw: &str) -> Codename {
        Codename::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_viewer_scenario() {
        let store = Arc::new(MemoryStore::new());
        let engine = DecisionEngine::new(Arc::clone(&store));

        let viewer = store.insert_role(&NewRole::new("viewer", "")).await.unwrap();
        let role_view = store
            .insert_permission(&NewPermission {
                codename: codename("role_view"),
                name: "查看角色".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        store.grant_permission(viewer.id, role_view.id).await.unwrap();

        let x = principal(&store, "x", false).await;
        store.assign_role(x.id, viewer.id).await.unwrap();

        let granted = engine.authorize(&x, Some(&codename("role_view"))).await.unwrap();
        let denied = engine.authorize(&x, Some(&codename("role_create"))).await.unwrap();
        assert_eq!(granted, Decision::Granted);
        assert_eq!(denied, Decision::Denied);
    }

    #[tokio::test]
    async fn test_superuser_bypass_without_rows() {
        let store = Arc::new(MemoryStore::new());
        let engine = DecisionEngine::new(Arc::clone(&store));
        let root = principal(&store, "root", true).await;

        assert!(engine
            .authorize(&root, Some(&codename("anything_at_all")))
            .await
            .unwrap()
            .is_granted());
        assert!(engine.authorize(&root, None).await.unwrap().is_granted());
    }

    #[tokio::test]
    async fn test_absent_codename_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        let engine = DecisionEngine::new(Arc::clone(&store));
        let user = principal(&store, "plain", false).await;

        assert_eq!(engine.authorize(&user, None).await.unwrap(), Decision::Denied);
    }

    #[tokio::test]
    async fn test_effective_codenames_union_of_roles() {
        let store = Arc::new(MemoryStore::new());
        let engine = DecisionEngine::new(Arc::clone(&store));
        let user = principal(&store, "u", false).await;

        let mut perm_ids = Vec::new();
        for raw in ["user_view", "role_view", "role_delete"] {
            let perm = store
                .insert_permission(&NewPermission {
                    codename: codename(raw),
                    name: raw.to_uppercase(),
                    description: String::new(),
                })
                .await
                .unwrap();
            perm_ids.push(perm.id);
        }

        let a = store.insert_role(&NewRole::new("a", "")).await.unwrap();
        let b = store.insert_role(&NewRole::new("b", "")).await.unwrap();
        store.grant_permission(a.id, perm_ids[0]).await.unwrap();
        store.grant_permission(b.id, perm_ids[0]).await.unwrap();
        store.grant_permission(b.id, perm_ids[1]).await.unwrap();
        store.assign_role(user.id, a.id).await.unwrap();
        store.assign_role(user.id, b.id).await.unwrap();

        let held = engine.effective_codenames(&user).await.unwrap();
        assert_eq!(held, vec![codename("role_view"), codename("user_view")]);
    }
}
