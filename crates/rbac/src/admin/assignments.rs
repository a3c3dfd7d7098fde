//! Role-permission and user-role associations, plus the well-known role
//! helpers built on top of them.

use warden_core::{DomainError, DomainResult, PermissionId, RoleId, UserId};

use super::{RbacAdmin, require_non_empty};
use crate::role::{Role, WellKnownRole};
use crate::store::{PermissionStore, RoleStore, StoreError};

impl<R, P> RbacAdmin<R, P>
where
    R: RoleStore,
    P: PermissionStore,
{
    /// Attach permissions to a role as one atomic batch.
    ///
    /// Duplicate membership is a `Conflict`, never silently skipped.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn add_permissions_to_role(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> DomainResult<()> {
        require_non_empty(permission_ids, "permission id")?;
        self.call(
            "add_permissions_to_role",
            self.roles.add_permissions(role_id, permission_ids),
        )
        .await?;
        tracing::info!(%role_id, count = permission_ids.len(), "permissions attached to role");
        Ok(())
    }

    /// Detach permissions from a role. Pairings that do not exist are ignored;
    /// an unknown role is `NotFound`.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn remove_permissions_from_role(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> DomainResult<()> {
        require_non_empty(permission_ids, "permission id")?;
        self.call(
            "remove_permissions_from_role",
            self.roles.remove_permissions(role_id, permission_ids),
        )
        .await
    }

    /// Assign roles to a user as one atomic batch.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn add_roles_to_user(&self, user_id: UserId, role_ids: &[RoleId]) -> DomainResult<()> {
        require_non_empty(role_ids, "role id")?;
        self.call("add_roles_to_user", self.roles.add_user(user_id, role_ids))
            .await?;
        tracing::info!(%user_id, count = role_ids.len(), "roles assigned to user");
        Ok(())
    }

    /// Revoke roles from a user. Pairings that do not exist are ignored.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn remove_roles_from_user(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> DomainResult<()> {
        require_non_empty(role_ids, "role id")?;
        self.call(
            "remove_roles_from_user",
            self.roles.remove_user(user_id, role_ids),
        )
        .await
    }

    /// Resolve a well-known role by its reserved name.
    ///
    /// A missing row means bootstrap never ran: that is `Internal`, not
    /// `NotFound`.
    pub async fn well_known_role(&self, which: WellKnownRole) -> DomainResult<Role> {
        match self.raw(self.roles.find_by_name(which.name())).await {
            Ok(role) => Ok(role),
            Err(StoreError::NotFound(_)) => Err(role_not_seeded(which)),
            Err(e) => Err(e.into_domain("well_known_role")),
        }
    }

    pub async fn bootstrap_default_role_permissions(
        &self,
        permission_ids: &[PermissionId],
    ) -> DomainResult<()> {
        self.grant_well_known(WellKnownRole::Default, permission_ids)
            .await
    }

    pub async fn bootstrap_super_role_permissions(
        &self,
        permission_ids: &[PermissionId],
    ) -> DomainResult<()> {
        self.grant_well_known(WellKnownRole::Super, permission_ids)
            .await
    }

    /// Assign the default role; called when a user is created.
    pub async fn promote_user_to_default(&self, user_id: UserId) -> DomainResult<()> {
        self.assign_well_known(WellKnownRole::Default, user_id).await
    }

    /// Assign the super role (administrative elevation).
    pub async fn promote_user_to_super(&self, user_id: UserId) -> DomainResult<()> {
        self.assign_well_known(WellKnownRole::Super, user_id).await
    }

    async fn grant_well_known(
        &self,
        which: WellKnownRole,
        permission_ids: &[PermissionId],
    ) -> DomainResult<()> {
        let role = self.well_known_role(which).await?;
        self.add_permissions_to_role(role.id, permission_ids).await
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    async fn assign_well_known(&self, which: WellKnownRole, user_id: UserId) -> DomainResult<()> {
        let role = self.well_known_role(which).await?;
        self.add_roles_to_user(user_id, &[role.id]).await
    }
}

fn role_not_seeded(which: WellKnownRole) -> DomainError {
    tracing::error!(role = %which, "well-known role missing; bootstrap has not run");
    DomainError::internal(format!("role not seeded: {}", which.name()))
}
