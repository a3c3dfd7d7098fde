//! Role administration: mutations over roles, permissions and their
//! associations.
//!
//! Each operation validates its input before touching storage, and translates
//! any storage failure exactly once on the way out. Nothing here composes
//! several administrative calls into one transaction.

mod assignments;
mod permissions;

use std::future::Future;

use warden_core::{DomainError, DomainResult, Page, PageParams, RoleId, UserId};

use crate::config::RbacConfig;
use crate::role::{Role, RolePatch, WellKnownRole};
use crate::store::{PermissionStore, RoleStore, StoreError, with_deadline};

/// Administration service over a role store and a permission store.
#[derive(Debug, Clone)]
pub struct RbacAdmin<R, P> {
    roles: R,
    permissions: P,
    config: RbacConfig,
}

impl<R, P> RbacAdmin<R, P>
where
    R: RoleStore,
    P: PermissionStore,
{
    pub fn new(roles: R, permissions: P, config: RbacConfig) -> Self {
        Self {
            roles,
            permissions,
            config,
        }
    }

    pub fn config(&self) -> &RbacConfig {
        &self.config
    }

    /// One storage round-trip, bounded by the configured deadline.
    async fn raw<T>(&self, call: impl Future<Output = Result<T, StoreError>>) -> Result<T, StoreError> {
        with_deadline(self.config.store_timeout, call).await
    }

    /// One storage round-trip, translated into the domain taxonomy.
    async fn call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> DomainResult<T> {
        self.raw(call).await.map_err(|e| e.into_domain(operation))
    }

    async fn require_role(&self, operation: &'static str, id: RoleId) -> DomainResult<Role> {
        self.call(operation, self.roles.find_by_ids(&[id]))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found(format!("role {id}")))
    }

    /// Create a role. `Conflict` if the name is taken.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn create_role(&self, name: &str, description: Option<&str>) -> DomainResult<RoleId> {
        let role = Role::new(name, description.map(str::to_string))?;
        self.call("create_role", self.roles.create(&role)).await?;
        tracing::info!(role_id = %role.id, name = %role.name, "role created");
        Ok(role.id)
    }

    /// Update only the supplied fields.
    ///
    /// Well-known roles keep their reserved names, and no other role may take
    /// one.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn patch_role(&self, id: RoleId, patch: RolePatch) -> DomainResult<Role> {
        let patch = patch.validated()?;
        let current = self.require_role("patch_role", id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        if let Some(name) = patch.name.as_deref().filter(|n| *n != current.name) {
            if let Some(reserved) = current.well_known() {
                return Err(DomainError::validation(format!(
                    "well-known role '{reserved}' cannot be renamed"
                )));
            }
            if WellKnownRole::from_name(name).is_some() {
                return Err(DomainError::validation(format!("role name '{name}' is reserved")));
            }
        }

        self.call("patch_role", self.roles.patch(id, &patch)).await
    }

    /// Delete a role together with its permission and user associations.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn delete_role(&self, id: RoleId) -> DomainResult<()> {
        let current = self.require_role("delete_role", id).await?;
        if let Some(reserved) = current.well_known() {
            return Err(DomainError::validation(format!(
                "well-known role '{reserved}' cannot be deleted"
            )));
        }
        self.call("delete_role", self.roles.delete(id)).await?;
        tracing::info!(role_id = %id, "role deleted");
        Ok(())
    }

    pub async fn get_roles(&self, ids: &[RoleId]) -> DomainResult<Vec<Role>> {
        self.call("get_roles", self.roles.find_by_ids(ids)).await
    }

    pub async fn get_role_by_name(&self, name: &str) -> DomainResult<Role> {
        self.call("get_role_by_name", self.roles.find_by_name(name)).await
    }

    /// Roles assigned to a user; empty when the user has none.
    pub async fn roles_for_user(&self, user_id: UserId) -> DomainResult<Vec<Role>> {
        match self.raw(self.roles.find_by_user_id(user_id)).await {
            Ok(roles) => Ok(roles),
            Err(StoreError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into_domain("roles_for_user")),
        }
    }

    pub async fn list_roles(&self, params: PageParams) -> DomainResult<Page<Role>> {
        let params = params.clamped(self.config.max_page_size);
        self.call("list_roles", self.roles.list(params)).await
    }
}

fn require_non_empty<T>(items: &[T], what: &str) -> DomainResult<()> {
    if items.is_empty() {
        return Err(DomainError::validation(format!("at least one {what} is required")));
    }
    Ok(())
}
