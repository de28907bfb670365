//! # rolegate
//!
//! Role-based access control: who may do what, decided from roles and the
//! permissions granted to them.
//!
//! ## Overview
//!
//! - **Principals** are user accounts. Superusers bypass every check.
//! - **Permissions** form a catalog keyed by stable codenames.
//! - **Roles** bundle permissions and are assigned to principals.
//! - **Operations** declare a codename and/or an ownership requirement, which
//!   the [`Gate`] enforces before running a handler.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rolegate::{Gate, GateConfig, Operation};
//! use rolegate::core::NewUser;
//!
//! async fn example() {
//!     let gate = Gate::open(GateConfig::default()).unwrap();
//!     gate.bootstrap().await.unwrap();
//!
//!     let alice = gate
//!         .register_user(NewUser::new("alice", "alice@example.com", "s3cret-pass"))
//!         .await
//!         .unwrap();
//!
//!     // Fails with a 403-class error until alice is assigned a role.
//!     let outcome = gate.guard(Some(&alice), Operation::RoleList, None).await;
//!     assert!(outcome.is_err());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `rolegate::core` - Domain types and validation
//! - `rolegate::store` - Storage abstraction and SQLite
//! - `rolegate::perms` - Decisions, ownership and enforcement

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod gate;

// Re-export component crates
pub use rolegate_core as core;
pub use rolegate_perms as perms;
pub use rolegate_store as store;

// Re-export main types for convenience
pub use bootstrap::{builtin_catalog, BootstrapReport, ADMIN_ROLE, USER_ROLE};
pub use config::{AccountSeed, BootstrapConfig, GateConfig};
pub use error::{GateError, Result};
pub use gate::Gate;

// Re-export commonly used decision types
pub use rolegate_perms::{
    AccessError, Decision, Denial, Operation, OperationPolicy, OwnerRef, Owned,
};
