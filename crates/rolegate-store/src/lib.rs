//! # rolegate store
//!
//! Storage abstraction for rolegate. Persists principals, the permission
//! catalog, roles and the two association tables behind the [`Store`] trait.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting an association row
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rolegate_core::{Codename, UserId};
//! use rolegate_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("rolegate.db").unwrap();
//!     let codename = Codename::new("user_view").unwrap();
//!     let allowed = store.has_permission(UserId::new(1), &codename).await.unwrap();
//!     println!("allowed: {allowed}");
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent associations**: granting or assigning twice returns `AlreadyExists`
//! - **Cascades**: deleting a role, permission or user removes dependent rows
//! - **Atomic seeding**: each catalog seed entry is resolved and written in one step

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store};

/// Wall-clock time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
