//! The enforcement wrapper.
//!
//! Guarded operations declare an [`OperationPolicy`]. The [`Enforcer`]
//! evaluates it in a fixed order and short-circuits on the first failure:
//!
//! 1. a principal must be present, else [`AccessError::Unauthenticated`]
//! 2. a declared ownership requirement, else [`Denial::NotOwner`]
//! 3. a declared codename, else [`Denial::MissingPermission`]
//!
//! Ownership comes before the codename so a non-owner learns only that the
//! row is not theirs, not which permission gates the action.

use std::future::Future;

use rolegate_core::{Codename, Principal};
use rolegate_store::Store;
use tracing::debug;

use crate::decision::DecisionEngine;
use crate::error::{AccessError, Denial};
use crate::ownership::{check_ownership, Owned};

/// What a guarded operation requires of its caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationPolicy {
    /// Required permission codename, if any.
    pub permission: Option<Codename>,
    /// Whether the caller must own the target resource.
    pub ownership: bool,
}

impl OperationPolicy {
    /// Authentication only.
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Require a permission codename.
    pub fn permission(codename: Codename) -> Self {
        Self {
            permission: Some(codename),
            ownership: false,
        }
    }

    /// Require ownership of the target.
    pub fn owner() -> Self {
        Self {
            permission: None,
            ownership: true,
        }
    }

    /// Require both ownership and a permission codename.
    pub fn owner_with(codename: Codename) -> Self {
        Self {
            permission: Some(codename),
            ownership: true,
        }
    }
}

/// Runs policy checks in front of guarded operations.
pub struct Enforcer<S: Store> {
    engine: DecisionEngine<S>,
}

impl<S: Store> Clone for Enforcer<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<S: Store> Enforcer<S> {
    pub fn new(engine: DecisionEngine<S>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &DecisionEngine<S> {
        &self.engine
    }

    /// Evaluate `policy` for `principal` against an optional `target`.
    ///
    /// Superusers pass any ownership requirement, with or without a target.
    /// Anyone else facing an ownership requirement with no target is denied.
    pub async fn check(
        &self,
        principal: Option<&Principal>,
        policy: &OperationPolicy,
        target: Option<&dyn Owned>,
    ) -> Result<(), AccessError> {
        let principal = principal.ok_or(AccessError::Unauthenticated)?;

        if policy.ownership {
            let owned = principal.is_superuser
                || target.is_some_and(|t| check_ownership(principal, t).is_granted());
            if !owned {
                debug!(user = %principal.id, "ownership check failed");
                return Err(AccessError::Forbidden(Denial::NotOwner));
            }
        }

        if let Some(codename) = &policy.permission {
            let decision = self.engine.authorize(principal, Some(codename)).await?;
            if !decision.is_granted() {
                return Err(AccessError::Forbidden(Denial::MissingPermission(
                    codename.clone(),
                )));
            }
        }

        Ok(())
    }

    /// Run `operation` only if `check` passes, returning its output unchanged.
    pub async fn enforce<F, T>(
        &self,
        principal: Option<&Principal>,
        policy: &OperationPolicy,
        target: Option<&dyn Owned>,
        operation: F,
    ) -> Result<T, AccessError>
    where
        F: Future<Output = T>,
    {
        self.check(principal, policy, target).await?;
        Ok(operation.await)
    }
}
