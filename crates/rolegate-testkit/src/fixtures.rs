//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. Fixture helpers panic on
//! failure; they are only ever called from tests.

use std::sync::Arc;

use rolegate_core::{
    Codename, NewPermission, NewPrincipal, NewRole, Permission, Principal, Role,
};
use rolegate_store::{MemoryStore, Store};

use crate::generators::GrantGraph;

/// A test fixture over a shared in-memory store.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Insert an active, unprivileged principal with no password.
    pub async fn user(&self, username: &str) -> Principal {
        self.insert_principal(username, false).await
    }

    /// Insert a superuser.
    pub async fn superuser(&self, username: &str) -> Principal {
        self.insert_principal(username, true).await
    }

    async fn insert_principal(&self, username: &str, superuser: bool) -> Principal {
        self.store
            .insert_user(&NewPrincipal {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                is_active: true,
                is_staff: superuser,
                is_superuser: superuser,
            })
            .await
            .expect("insert principal")
    }

    pub async fn role(&self, name: &str) -> Role {
        self.store
            .insert_role(&NewRole::new(name, ""))
            .await
            .expect("insert role")
    }

    /// Insert a permission whose display name is its codename.
    pub async fn permission(&self, codename: &str) -> Permission {
        self.store
            .insert_permission(&NewPermission {
                codename: Codename::new(codename).expect("valid codename"),
                name: codename.to_string(),
                description: String::new(),
            })
            .await
            .expect("insert permission")
    }

    pub async fn grant(&self, role: &Role, permission: &Permission) {
        self.store
            .grant_permission(role.id, permission.id)
            .await
            .expect("grant permission");
    }

    pub async fn assign(&self, user: &Principal, role: &Role) {
        self.store
            .assign_role(user.id, role.id)
            .await
            .expect("assign role");
    }

    /// A role named `name` granted exactly `codenames`, creating missing
    /// permissions.
    pub async fn role_with(&self, name: &str, codenames: &[&str]) -> Role {
        let role = self.role(name).await;
        for raw in codenames {
            let codename = Codename::new(*raw).expect("valid codename");
            let perm = match self
                .store
                .get_permission_by_codename(&codename)
                .await
                .expect("lookup permission")
            {
                Some(perm) => perm,
                None => self.permission(raw).await,
            };
            self.grant(&role, &perm).await;
        }
        role
    }

    /// Write every row of `graph` into the store.
    pub async fn load_graph(&self, graph: &GrantGraph) -> LoadedGraph {
        let mut users = Vec::with_capacity(graph.users);
        for i in 0..graph.users {
            users.push(self.user(&format!("user{i}")).await);
        }
        let mut roles = Vec::with_capacity(graph.roles);
        for i in 0..graph.roles {
            roles.push(self.role(&format!("role{i}")).await);
        }
        let mut permissions = Vec::with_capacity(graph.codenames.len());
        for codename in &graph.codenames {
            permissions.push(self.permission(codename.as_str()).await);
        }
        for &(role, perm) in &graph.grants {
            self.grant(&roles[role], &permissions[perm]).await;
        }
        for &(user, role) in &graph.assignments {
            self.assign(&users[user], &roles[role]).await;
        }
        LoadedGraph {
            users,
            roles,
            permissions,
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows created by [`TestFixture::load_graph`], indexed like the graph.
#[derive(Debug)]
pub struct LoadedGraph {
    pub users: Vec<Principal>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_role_with_reuses_permissions() {
        let fixture = TestFixture::new();
        fixture.role_with("a", &["role_view", "role_create"]).await;
        fixture.role_with("b", &["role_view"]).await;

        let counts = fixture.store.counts().await.unwrap();
        assert_eq!(counts.permissions, 2);
        assert_eq!(counts.grants, 3);
    }

    #[tokio::test]
    async fn test_load_graph() {
        let fixture = TestFixture::new();
        let graph = GrantGraph {
            users: 2,
            roles: 1,
            codenames: vec![Codename::new("user_view").unwrap()],
            grants: vec![(0, 0)],
            assignments: vec![(1, 0)],
        };
        let loaded = fixture.load_graph(&graph).await;

        assert_eq!(loaded.users.len(), 2);
        assert!(fixture
            .store
            .has_permission(loaded.users[1].id, &graph.codenames[0])
            .await
            .unwrap());
        assert!(!fixture
            .store
            .has_permission(loaded.users[0].id, &graph.codenames[0])
            .await
            .unwrap());
    }
}
