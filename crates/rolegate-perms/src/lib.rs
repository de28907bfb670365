//! # rolegate perms
//!
//! Access decisions and their enforcement.
//!
//! ## Overview
//!
//! - [`DecisionEngine`] answers whether a principal holds a codename, through
//!   any of its roles. Superusers always pass; absent codenames fail closed.
//! - [`check_ownership`] restricts self-scoped resources to their owner.
//! - [`Enforcer`] composes both behind an [`OperationPolicy`], in the order
//!   authentication, ownership, permission.
//! - [`Operation`] is the declaration table of the administrative surface.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rolegate_perms::{DecisionEngine, Enforcer, Access, Operation};
//! use rolegate_store::MemoryStore;
//!
//! async fn example(actor: &rolegate_core::Principal) {
//!     let enforcer = Enforcer::new(DecisionEngine::new(Arc::new(MemoryStore::new())));
//!     if let Access::Guarded(policy) = Operation::RoleList.access() {
//!         enforcer.check(Some(actor), &policy, None).await.unwrap();
//!     }
//! }
//! ```

pub mod decision;
pub mod enforce;
pub mod error;
pub mod operations;
pub mod ownership;

pub use decision::{Decision, DecisionEngine};
pub use enforce::{Enforcer, OperationPolicy};
pub use error::{AccessError, Denial, PermsError, Result};
pub use operations::{Access, Operation};
pub use ownership::{check_ownership, OwnerRef, Owned};
