//! # rolegate testkit
//!
//! Testing utilities for rolegate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: [`TestFixture`] builds users, roles, permissions and edges
//!   over a shared in-memory store
//! - **Generators**: Proptest strategies, including random role graphs with a
//!   reference answer for every decision
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use rolegate_testkit::GrantGraph;
//!
//! proptest! {
//!     #[test]
//!     fn graph_is_consistent(graph: GrantGraph) {
//!         for &(role, _) in &graph.grants {
//!             prop_assert!(role < graph.roles);
//!         }
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{LoadedGraph, TestFixture};
pub use generators::{codename, codenames, GrantGraph};
