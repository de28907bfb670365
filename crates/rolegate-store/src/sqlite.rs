//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for rolegate. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking. Uniqueness and
//! referential cascades are enforced by the schema, not by application code.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use rolegate_core::{
    plan_permission_seed, Assignment, AssignmentDetail, AssignmentId, Codename, GrantDetail,
    GrantId, NewPermission, NewPrincipal, NewRole, Permission, PermissionId, PermissionPatch,
    PermissionSeed, Principal, Role, RoleGrant, RoleId, RolePatch, SeedOutcome, SeedPlan,
    TableCounts, UserId, UserPatch,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Store};

/// How long a writer waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
                            is_active, is_staff, is_superuser, date_joined";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::init(conn)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

// Row helpers

fn row_to_principal(row: &rusqlite::Row<'_>) -> rusqlite::Result<Principal> {
    Ok(Principal {
        id: UserId::new(row.get("id")?),
        username: row.get("username")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        is_active: row.get("is_active")?,
        is_staff: row.get("is_staff")?,
        is_superuser: row.get("is_superuser")?,
        date_joined: row.get("date_joined")?,
    })
}

fn codename_column(row: &rusqlite::Row<'_>, idx: &str) -> rusqlite::Result<Codename> {
    let raw: String = row.get(idx)?;
    Codename::new(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

fn row_to_permission(row: &rusqlite::Row<'_>) -> rusqlite::Result<Permission> {
    Ok(Permission {
        id: PermissionId::new(row.get("id")?),
        codename: codename_column(row, "codename")?,
        name: row.get("name")?,
        description: row.get("description")?,
    })
}

fn row_to_role(row: &rusqlite::Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: RoleId::new(row.get("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
    })
}

fn query_user(conn: &Connection, id: UserId) -> Result<Option<Principal>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id.get()],
        row_to_principal,
    )
    .optional()
    .map_err(StoreError::from)
}

fn query_permission(conn: &Connection, id: PermissionId) -> Result<Option<Permission>> {
    conn.query_row(
        "SELECT id, codename, name, description FROM permissions WHERE id = ?1",
        params![id.get()],
        row_to_permission,
    )
    .optional()
    .map_err(StoreError::from)
}

fn query_permission_by(conn: &Connection, column: &str, value: &str) -> Result<Option<Permission>> {
    conn.query_row(
        &format!("SELECT id, codename, name, description FROM permissions WHERE {column} = ?1"),
        params![value],
        row_to_permission,
    )
    .optional()
    .map_err(StoreError::from)
}

fn query_role(conn: &Connection, id: RoleId) -> Result<Option<Role>> {
    conn.query_row(
        "SELECT id, name, description FROM roles WHERE id = ?1",
        params![id.get()],
        row_to_role,
    )
    .optional()
    .map_err(StoreError::from)
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_user(&self, user: &NewPrincipal) -> Result<Principal> {
        let user = user.clone();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO users (
                    username, email, password_hash, first_name, last_name,
                    is_active, is_staff, is_superuser, date_joined
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.username,
                    user.email,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.is_active,
                    user.is_staff,
                    user.is_superuser,
                    crate::now_millis(),
                ],
            )?;
            let id = UserId::new(conn.last_insert_rowid());
            query_user(conn, id)?
                .ok_or_else(|| StoreError::InvalidData(format!("user {id} vanished after insert")))
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<Principal>> {
        self.call(move |conn| query_user(conn, id)).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<Principal>> {
        let username = username.to_string();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                row_to_principal,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<Principal>> {
        self.call(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
            let users = stmt
                .query_map([], row_to_principal)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
        .await
    }

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<Principal> {
        let patch = patch.clone();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let mut user = query_user(&tx, id)?
                .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;

            if let Some(username) = patch.username {
                user.username = username;
            }
            if let Some(email) = patch.email {
                user.email = email;
            }
            if let Some(first_name) = patch.first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = patch.last_name {
                user.last_name = last_name;
            }
            if let Some(is_active) = patch.is_active {
                user.is_active = is_active;
            }

            tx.execute(
                "UPDATE users SET username = ?2, email = ?3, first_name = ?4,
                                  last_name = ?5, is_active = ?6
                 WHERE id = ?1",
                params![
                    id.get(),
                    user.username,
                    user.email,
                    user.first_name,
                    user.last_name,
                    user.is_active,
                ],
            )?;
            tx.commit()?;
            Ok(user)
        })
        .await
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<()> {
        let password_hash = password_hash.to_string();
        self.call(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET password_hash = ?2 WHERE id = ?1",
                params![id.get(), password_hash],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("user {id}")));
            }
            Ok(())
        })
        .await
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        self.call(move |conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id.get()])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn insert_permission(&self, perm: &NewPermission) -> Result<Permission> {
        let perm = perm.clone();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO permissions (codename, name, description) VALUES (?1, ?2, ?3)",
                params![perm.codename.as_str(), perm.name, perm.description],
            )?;
            Ok(Permission {
                id: PermissionId::new(conn.last_insert_rowid()),
                codename: perm.codename,
                name: perm.name,
                description: perm.description,
            })
        })
        .await
    }

    async fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        self.call(move |conn| query_permission(conn, id)).await
    }

    async fn get_permission_by_codename(&self, codename: &Codename) -> Result<Option<Permission>> {
        let codename = codename.clone();
        self.call(move |conn| query_permission_by(conn, "codename", codename.as_str()))
            .await
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>> {
        self.call(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, codename, name, description FROM permissions ORDER BY id")?;
            let perms = stmt
                .query_map([], row_to_permission)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(perms)
        })
        .await
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        patch: &PermissionPatch,
    ) -> Result<Permission> {
        let patch = patch.clone();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let mut perm = query_permission(&tx, id)?
                .ok_or_else(|| StoreError::NotFound(format!("permission {id}")))?;

            if let Some(codename) = patch.codename {
                perm.codename = codename;
            }
            if let Some(name) = patch.name {
                perm.name = name;
            }
            if let Some(description) = patch.description {
                perm.description = description;
            }

            tx.execute(
                "UPDATE permissions SET codename = ?2, name = ?3, description = ?4 WHERE id = ?1",
                params![id.get(), perm.codename.as_str(), perm.name, perm.description],
            )?;
            tx.commit()?;
            Ok(perm)
        })
        .await
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<bool> {
        self.call(move |conn| {
            let deleted = conn.execute("DELETE FROM permissions WHERE id = ?1", params![id.get()])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn apply_permission_seed(
        &self,
        seed: &PermissionSeed,
        run_stamp: i64,
    ) -> Result<SeedOutcome> {
        let seed = seed.clone();
        self.call(move |conn| {
            // IMMEDIATE takes the write lock up front so a concurrent seeder
            // in another process cannot interleave between read and write.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let by_codename = query_permission_by(&tx, "codename", seed.codename.as_str())?;
            let by_name = query_permission_by(&tx, "name", &seed.name)?;

            let outcome = match plan_permission_seed(
                &seed,
                by_codename.as_ref(),
                by_name.as_ref(),
                run_stamp,
            ) {
                SeedPlan::Update {
                    id,
                    name,
                    description,
                    name_kept,
                } => {
                    tx.execute(
                        "UPDATE permissions SET name = ?2, description = ?3 WHERE id = ?1",
                        params![id.get(), name, description],
                    )?;
                    SeedOutcome::Updated { id, name_kept }
                }
                SeedPlan::Create {
                    name,
                    description,
                    disambiguated,
                } => {
                    tx.execute(
                        "INSERT INTO permissions (codename, name, description) VALUES (?1, ?2, ?3)",
                        params![seed.codename.as_str(), name, description],
                    )?;
                    SeedOutcome::Created {
                        id: PermissionId::new(tx.last_insert_rowid()),
                        name,
                        disambiguated,
                    }
                }
            };

            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn insert_role(&self, role: &NewRole) -> Result<Role> {
        let role = role.clone();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO roles (name, description) VALUES (?1, ?2)",
                params![role.name, role.description],
            )?;
            Ok(Role {
                id: RoleId::new(conn.last_insert_rowid()),
                name: role.name,
                description: role.description,
            })
        })
        .await
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        self.call(move |conn| query_role(conn, id)).await
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let name = name.to_string();
        self.call(move |conn| {
            conn.query_row(
                "SELECT id, name, description FROM roles WHERE name = ?1",
                params![name],
                row_to_role,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        self.call(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, description FROM roles ORDER BY id")?;
            let roles = stmt
                .query_map([], row_to_role)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(roles)
        })
        .await
    }

    async fn update_role(&self, id: RoleId, patch: &RolePatch) -> Result<Role> {
        let patch = patch.clone();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let mut role =
                query_role(&tx, id)?.ok_or_else(|| StoreError::NotFound(format!("role {id}")))?;

            if let Some(name) = patch.name {
                role.name = name;
            }
            if let Some(description) = patch.description {
                role.description = description;
            }

            tx.execute(
                "UPDATE roles SET name = ?2, description = ?3 WHERE id = ?1",
                params![id.get(), role.name, role.description],
            )?;
            tx.commit()?;
            Ok(role)
        })
        .await
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool> {
        self.call(move |conn| {
            let deleted = conn.execute("DELETE FROM roles WHERE id = ?1", params![id.get()])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn grant_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<InsertResult<GrantId>> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
                params![role.get(), permission.get()],
            )?;

            let result = if inserted > 0 {
                InsertResult::Inserted(GrantId::new(tx.last_insert_rowid()))
            } else {
                let id: i64 = tx.query_row(
                    "SELECT id FROM role_permissions WHERE role_id = ?1 AND permission_id = ?2",
                    params![role.get(), permission.get()],
                    |row| row.get(0),
                )?;
                InsertResult::AlreadyExists(GrantId::new(id))
            };

            tx.commit()?;
            Ok(result)
        })
        .await
    }

    async fn revoke_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool> {
        self.call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM role_permissions WHERE role_id = ?1 AND permission_id = ?2",
                params![role.get(), permission.get()],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_grants(&self, role: Option<RoleId>) -> Result<Vec<GrantDetail>> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT rp.id, rp.role_id, rp.permission_id,
                        r.name AS role_name, p.name AS permission_name, p.codename
                 FROM role_permissions rp
                 JOIN roles r ON r.id = rp.role_id
                 JOIN permissions p ON p.id = rp.permission_id
                 WHERE ?1 IS NULL OR rp.role_id = ?1
                 ORDER BY rp.id",
            )?;

            let grants = stmt
                .query_map(params![role.map(RoleId::get)], |row| {
                    Ok(GrantDetail {
                        grant: RoleGrant {
                            id: GrantId::new(row.get("id")?),
                            role_id: RoleId::new(row.get("role_id")?),
                            permission_id: PermissionId::new(row.get("permission_id")?),
                        },
                        role_name: row.get("role_name")?,
                        permission_name: row.get("permission_name")?,
                        codename: codename_column(row, "codename")?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(grants)
        })
        .await
    }

    async fn assign_role(&self, user: UserId, role: RoleId) -> Result<InsertResult<AssignmentId>> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
                params![user.get(), role.get()],
            )?;

            let result = if inserted > 0 {
                InsertResult::Inserted(AssignmentId::new(tx.last_insert_rowid()))
            } else {
                let id: i64 = tx.query_row(
                    "SELECT id FROM user_roles WHERE user_id = ?1 AND role_id = ?2",
                    params![user.get(), role.get()],
                    |row| row.get(0),
                )?;
                InsertResult::AlreadyExists(AssignmentId::new(id))
            };

            tx.commit()?;
            Ok(result)
        })
        .await
    }

    async fn unassign_role(&self, user: UserId, role: RoleId) -> Result<bool> {
        self.call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM user_roles WHERE user_id = ?1 AND role_id = ?2",
                params![user.get(), role.get()],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>> {
        self.call(move |conn| {
            conn.query_row(
                "SELECT id, user_id, role_id FROM user_roles WHERE id = ?1",
                params![id.get()],
                |row| {
                    Ok(Assignment {
                        id: AssignmentId::new(row.get(0)?),
                        user_id: UserId::new(row.get(1)?),
                        role_id: RoleId::new(row.get(2)?),
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_assignments(&self, user: Option<UserId>) -> Result<Vec<AssignmentDetail>> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT ur.id, ur.user_id, ur.role_id, u.username, r.name AS role_name
                 FROM user_roles ur
                 JOIN users u ON u.id = ur.user_id
                 JOIN roles r ON r.id = ur.role_id
                 WHERE ?1 IS NULL OR ur.user_id = ?1
                 ORDER BY ur.id",
            )?;

            let assignments = stmt
                .query_map(params![user.map(UserId::get)], |row| {
                    Ok(AssignmentDetail {
                        assignment: Assignment {
                            id: AssignmentId::new(row.get("id")?),
                            user_id: UserId::new(row.get("user_id")?),
                            role_id: RoleId::new(row.get("role_id")?),
                        },
                        username: row.get("username")?,
                        role_name: row.get("role_name")?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(assignments)
        })
        .await
    }

    async fn role_ids_for_user(&self, user: UserId) -> Result<Vec<RoleId>> {
        self.call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT role_id FROM user_roles WHERE user_id = ?1 ORDER BY role_id")?;
            let roles = stmt
                .query_map(params![user.get()], |row| row.get::<_, i64>(0).map(RoleId::new))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(roles)
        })
        .await
    }

    async fn has_permission(&self, user: UserId, codename: &Codename) -> Result<bool> {
        let codename = codename.clone();
        self.call(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM user_roles ur
                    JOIN role_permissions rp ON rp.role_id = ur.role_id
                    JOIN permissions p ON p.id = rp.permission_id
                    WHERE ur.user_id = ?1 AND p.codename = ?2
                 )",
                params![user.get(), codename.as_str()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn codenames_for_user(&self, user: UserId) -> Result<Vec<Codename>> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT p.codename FROM user_roles ur
                 JOIN role_permissions rp ON rp.role_id = ur.role_id
                 JOIN permissions p ON p.id = rp.permission_id
                 WHERE ur.user_id = ?1
                 ORDER BY p.codename",
            )?;
            let codenames = stmt
                .query_map(params![user.get()], |row| codename_column(row, "codename"))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(codenames)
        })
        .await
    }

    async fn counts(&self) -> Result<TableCounts> {
        self.call(|conn| {
            conn.query_row(
                "SELECT (SELECT COUNT(*) FROM users),
                        (SELECT COUNT(*) FROM permissions),
                        (SELECT COUNT(*) FROM roles),
                        (SELECT COUNT(*) FROM role_permissions),
                        (SELECT COUNT(*) FROM user_roles)",
                [],
                |row| {
                    Ok(TableCounts {
                        users: row.get::<_, i64>(0)? as u64,
                        permissions: row.get::<_, i64>(1)? as u64,
                        roles: row.get::<_, i64>(2)? as u64,
                        grants: row.get::<_, i64>(3)? as u64,
                        assignments: row.get::<_, i64>(4)? as u64,
                    })
                },
            )
            .map_err(StoreError::from)
        })
        .await
    }
}
