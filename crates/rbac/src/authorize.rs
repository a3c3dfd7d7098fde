//! Authorization engine: the read path.
//!
//! Every check re-reads the user's roles from the store; nothing is cached.
//! Every negative or failing path collapses into [`Decision::Unauthorized`] so
//! callers cannot tell an unknown user from a user without the permission.

use std::collections::HashSet;

use serde::Serialize;

use warden_core::{DomainError, DomainResult, UserId};

use crate::codec::PermissionCode;
use crate::config::RbacConfig;
use crate::role::Role;
use crate::store::{RoleStore, StoreError, with_deadline};

/// Outcome of an authorization check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Authorized,
    Unauthorized,
}

impl Decision {
    pub fn is_authorized(self) -> bool {
        self == Decision::Authorized
    }

    /// `Err(Unauthorized)` unless authorized.
    pub fn into_result(self) -> DomainResult<()> {
        match self {
            Decision::Authorized => Ok(()),
            Decision::Unauthorized => Err(DomainError::Unauthorized),
        }
    }
}

/// Why a check was denied. Diagnostic only; never crosses the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Denial {
    /// The caller asked for nothing.
    EmptyRequirement,
    /// The user holds no roles.
    NoRoles,
    /// The user's roles lack these required codes.
    MissingPermissions { missing: Vec<PermissionCode> },
    /// The role lookup failed.
    StoreFailure { error: String },
}

impl Denial {
    fn label(&self) -> &'static str {
        match self {
            Denial::EmptyRequirement => "empty_requirement",
            Denial::NoRoles => "no_roles",
            Denial::MissingPermissions { .. } => "missing_permissions",
            Denial::StoreFailure { .. } => "store_failure",
        }
    }
}

/// A decision plus the internal reason behind a denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub decision: Decision,
    pub denial: Option<Denial>,
}

impl Evaluation {
    fn authorized() -> Self {
        Self {
            decision: Decision::Authorized,
            denial: None,
        }
    }

    fn denied(denial: Denial) -> Self {
        Self {
            decision: Decision::Unauthorized,
            denial: Some(denial),
        }
    }
}

/// Union of the permission codes of a set of roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(HashSet<PermissionCode>);

impl PermissionSet {
    pub fn from_roles(roles: &[Role]) -> Self {
        Self(
            roles
                .iter()
                .flat_map(|role| role.permissions.iter().map(|p| p.code()))
                .collect(),
        )
    }

    /// Exact string membership; no prefix or wildcard matching.
    pub fn contains(&self, code: &PermissionCode) -> bool {
        self.0.contains(code)
    }

    /// Required codes absent from the set, in request order.
    pub fn missing(&self, required: &[PermissionCode]) -> Vec<PermissionCode> {
        required
            .iter()
            .filter(|code| !self.contains(code))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_sorted_vec(self) -> Vec<PermissionCode> {
        let mut codes: Vec<_> = self.0.into_iter().collect();
        codes.sort();
        codes
    }
}

/// Stateless authorization service over a role store.
#[derive(Debug, Clone)]
pub struct Authorizer<R> {
    roles: R,
    config: RbacConfig,
}

impl<R: RoleStore> Authorizer<R> {
    pub fn new(roles: R, config: RbacConfig) -> Self {
        Self { roles, config }
    }

    /// Authorized iff every required code is held (logical AND).
    pub async fn is_authorized(&self, user_id: UserId, required: &[PermissionCode]) -> Decision {
        self.evaluate(user_id, required).await.decision
    }

    /// Single-permission form of [`Authorizer::is_authorized`].
    pub async fn permits(&self, user_id: UserId, required: &PermissionCode) -> Decision {
        self.is_authorized(user_id, std::slice::from_ref(required))
            .await
    }

    /// Decide and keep the reason for diagnostics.
    #[tracing::instrument(skip(self, required), fields(required = ?required))]
    pub async fn evaluate(&self, user_id: UserId, required: &[PermissionCode]) -> Evaluation {
        let evaluation = self.decide(user_id, required).await;
        match &evaluation.denial {
            None => tracing::debug!("authorized"),
            Some(Denial::StoreFailure { error }) => {
                tracing::warn!(reason = "store_failure", %error, "authorization denied")
            }
            Some(denial) => tracing::debug!(reason = denial.label(), "authorization denied"),
        }
        evaluation
    }

    async fn decide(&self, user_id: UserId, required: &[PermissionCode]) -> Evaluation {
        if required.is_empty() {
            return Evaluation::denied(Denial::EmptyRequirement);
        }

        let roles = match self.fetch_roles(user_id).await {
            Ok(roles) if roles.is_empty() => return Evaluation::denied(Denial::NoRoles),
            Ok(roles) => roles,
            Err(StoreError::NotFound(_)) => return Evaluation::denied(Denial::NoRoles),
            Err(e) => {
                return Evaluation::denied(Denial::StoreFailure {
                    error: e.to_string(),
                });
            }
        };

        let missing = PermissionSet::from_roles(&roles).missing(required);
        if missing.is_empty() {
            Evaluation::authorized()
        } else {
            Evaluation::denied(Denial::MissingPermissions { missing })
        }
    }

    /// The user's effective permission codes, sorted. Empty for a user with
    /// no roles; storage failures surface as `Internal`.
    pub async fn effective_permissions(&self, user_id: UserId) -> DomainResult<Vec<PermissionCode>> {
        match self.fetch_roles(user_id).await {
            Ok(roles) => Ok(PermissionSet::from_roles(&roles).into_sorted_vec()),
            Err(StoreError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into_domain("effective_permissions")),
        }
    }

    async fn fetch_roles(&self, user_id: UserId) -> Result<Vec<Role>, StoreError> {
        with_deadline(self.config.store_timeout, self.roles.find_by_user_id(user_id)).await
    }
}
