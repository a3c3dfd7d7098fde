//! Storage collaborator boundary.
//!
//! The RBAC core only talks to persistence through these traits. Each call
//! is one round-trip; batch mutations must be atomic for their own rows.

pub mod in_memory;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use warden_core::{DomainError, Page, PageParams, PermissionId, RoleId, UserId};

use crate::permission::{Permission, PermissionKey};
use crate::role::{Role, RolePatch};

pub use in_memory::InMemoryRbacStore;

/// Storage-level failure, translated into a [`DomainError`] at the boundary
/// of the operation that observed it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No rows matched (missing entity, or a lookup that found nothing).
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness or primary-key constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The configured per-call deadline elapsed before the store answered.
    #[error("storage call exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// Translate into the domain taxonomy. Called once per failed operation.
    pub fn into_domain(self, operation: &'static str) -> DomainError {
        match self {
            StoreError::NotFound(msg) => DomainError::not_found(msg),
            StoreError::Conflict(msg) => DomainError::conflict(msg),
            other => {
                tracing::error!(operation, error = %other, "storage failure");
                DomainError::internal(format!("{operation}: {other}"))
            }
        }
    }
}

/// Run one storage round-trip, aborting it if `deadline` elapses first.
pub async fn with_deadline<T, F>(deadline: Option<Duration>, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| StoreError::DeadlineExceeded(limit))?,
        None => call.await,
    }
}

/// Role persistence.
///
/// Every role returned has its `permissions` materialized.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Roles with the given ids; unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[RoleId]) -> Result<Vec<Role>, StoreError>;

    /// Roles assigned to a user. Implementations may report a user with no
    /// roles either as an empty list or as `NotFound`.
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Role>, StoreError>;

    /// `NotFound` if no role has this name.
    async fn find_by_name(&self, name: &str) -> Result<Role, StoreError>;

    async fn list(&self, params: PageParams) -> Result<Page<Role>, StoreError>;

    /// `Conflict` if the name is taken.
    async fn create(&self, role: &Role) -> Result<(), StoreError>;

    /// Apply the supplied fields. `NotFound` if absent, `Conflict` on rename
    /// to a taken name.
    async fn patch(&self, id: RoleId, patch: &RolePatch) -> Result<Role, StoreError>;

    /// Delete the role and its role-permission and user-role rows.
    async fn delete(&self, id: RoleId) -> Result<(), StoreError>;

    /// Insert all pairings or none. `NotFound` for an unknown role or
    /// permission, `Conflict` if any pairing already exists.
    async fn add_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<(), StoreError>;

    /// Delete the matching pairings. `NotFound` only for an unknown role.
    async fn remove_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<(), StoreError>;

    /// Insert all user-role pairings or none. `NotFound` for an unknown role,
    /// `Conflict` if any pairing already exists.
    async fn add_user(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<(), StoreError>;

    /// Delete the matching user-role pairings.
    async fn remove_user(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<(), StoreError>;
}

/// Permission persistence.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// `Conflict` if the `(resource, action)` pair exists.
    async fn create(&self, permission: &Permission) -> Result<(), StoreError>;

    /// Insert all permissions or none.
    async fn create_many(&self, permissions: &[Permission]) -> Result<(), StoreError>;

    async fn find_by_ids(&self, ids: &[PermissionId]) -> Result<Vec<Permission>, StoreError>;

    /// Distinct permissions attached to any of the given roles.
    async fn find_by_role_ids(&self, role_ids: &[RoleId]) -> Result<Vec<Permission>, StoreError>;

    /// Permissions matching any of the given keys; unknown keys are skipped.
    async fn find_by_keys(&self, keys: &[PermissionKey]) -> Result<Vec<Permission>, StoreError>;

    async fn list(&self, params: PageParams) -> Result<Page<Permission>, StoreError>;

    /// Hard delete; cascades role-permission rows.
    async fn delete(&self, id: PermissionId) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: RoleStore + ?Sized> RoleStore for Arc<T> {
    async fn find_by_ids(&self, ids: &[RoleId]) -> Result<Vec<Role>, StoreError> {
        (**self).find_by_ids(ids).await
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Role>, StoreError> {
        (**self).find_by_user_id(user_id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Role, StoreError> {
        (**self).find_by_name(name).await
    }

    async fn list(&self, params: PageParams) -> Result<Page<Role>, StoreError> {
        RoleStore::list(&**self, params).await
    }

    async fn create(&self, role: &Role) -> Result<(), StoreError> {
        RoleStore::create(&**self, role).await
    }

    async fn patch(&self, id: RoleId, patch: &RolePatch) -> Result<Role, StoreError> {
        (**self).patch(id, patch).await
    }

    async fn delete(&self, id: RoleId) -> Result<(), StoreError> {
        RoleStore::delete(&**self, id).await
    }

    async fn add_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<(), StoreError> {
        (**self).add_permissions(role_id, permission_ids).await
    }

    async fn remove_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<(), StoreError> {
        (**self).remove_permissions(role_id, permission_ids).await
    }

    async fn add_user(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<(), StoreError> {
        (**self).add_user(user_id, role_ids).await
    }

    async fn remove_user(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<(), StoreError> {
        (**self).remove_user(user_id, role_ids).await
    }
}

#[async_trait]
impl<T: PermissionStore + ?Sized> PermissionStore for Arc<T> {
    async fn create(&self, permission: &Permission) -> Result<(), StoreError> {
        PermissionStore::create(&**self, permission).await
    }

    async fn create_many(&self, permissions: &[Permission]) -> Result<(), StoreError> {
        (**self).create_many(permissions).await
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> Result<Vec<Permission>, StoreError> {
        PermissionStore::find_by_ids(&**self, ids).await
    }

    async fn find_by_role_ids(&self, role_ids: &[RoleId]) -> Result<Vec<Permission>, StoreError> {
        (**self).find_by_role_ids(role_ids).await
    }

    async fn find_by_keys(&self, keys: &[PermissionKey]) -> Result<Vec<Permission>, StoreError> {
        (**self).find_by_keys(keys).await
    }

    async fn list(&self, params: PageParams) -> Result<Page<Permission>, StoreError> {
        PermissionStore::list(&**self, params).await
    }

    async fn delete(&self, id: PermissionId) -> Result<(), StoreError> {
        PermissionStore::delete(&**self, id).await
    }
}
