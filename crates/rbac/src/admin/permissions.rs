//! Permission catalog administration.

use warden_core::{DomainResult, Page, PageParams, PermissionId, RoleId};

use super::{RbacAdmin, require_non_empty};
use crate::permission::{Permission, PermissionKey};
use crate::store::{PermissionStore, RoleStore};

impl<R, P> RbacAdmin<R, P>
where
    R: RoleStore,
    P: PermissionStore,
{
    /// Register one permission. `Conflict` if the pair exists.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn create_permission(&self, resource: &str, action: &str) -> DomainResult<Permission> {
        let permission = Permission::new(PermissionKey::new(resource, action))?;
        self.call("create_permission", self.permissions.create(&permission))
            .await?;
        Ok(permission)
    }

    /// Register a batch of permissions atomically (bulk seed).
    #[tracing::instrument(skip(self, keys), fields(count = keys.len()), err(level = "debug"))]
    pub async fn create_permissions(&self, keys: &[PermissionKey]) -> DomainResult<Vec<Permission>> {
        require_non_empty(keys, "permission")?;
        let batch = keys
            .iter()
            .cloned()
            .map(Permission::new)
            .collect::<DomainResult<Vec<_>>>()?;
        self.call("create_permissions", self.permissions.create_many(&batch))
            .await?;
        tracing::info!(count = batch.len(), "permissions created");
        Ok(batch)
    }

    /// Hard delete; detaches the permission from every role.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn delete_permission(&self, id: PermissionId) -> DomainResult<()> {
        self.call("delete_permission", self.permissions.delete(id))
            .await
    }

    pub async fn get_permissions(&self, ids: &[PermissionId]) -> DomainResult<Vec<Permission>> {
        self.call("get_permissions", self.permissions.find_by_ids(ids))
            .await
    }

    pub async fn find_permissions(&self, keys: &[PermissionKey]) -> DomainResult<Vec<Permission>> {
        self.call("find_permissions", self.permissions.find_by_keys(keys))
            .await
    }

    /// Distinct permissions attached to any of the roles.
    pub async fn permissions_for_roles(&self, role_ids: &[RoleId]) -> DomainResult<Vec<Permission>> {
        self.call(
            "permissions_for_roles",
            self.permissions.find_by_role_ids(role_ids),
        )
        .await
    }

    pub async fn list_permissions(&self, params: PageParams) -> DomainResult<Page<Permission>> {
        let params = params.clamped(self.config.max_page_size);
        self.call("list_permissions", self.permissions.list(params))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::admin;
    use super::*;
    use warden_core::ErrorKind;

    #[tokio::test]
    async fn duplicate_pair_conflicts() {
        let (admin, _) = admin();
        admin.create_permission("perm", "read").await.unwrap();
        let err = admin.create_permission("perm", "read").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn invalid_pair_is_rejected_before_storage() {
        let (admin, _) = admin();
        let err = admin.create_permission("perm:x", "read").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = admin.create_permissions(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn bulk_create_is_atomic() {
        let (admin, _) = admin();
        admin.create_permission("perm", "read").await.unwrap();
        let err = admin
            .create_permissions(&[
                PermissionKey::new("perm", "create"),
                PermissionKey::new("perm", "read"),
            ])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let page = admin.list_permissions(PageParams::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn list_permissions_follows_creation_order() {
        let (admin, _) = admin();
        let mut created = Vec::new();
        for action in ["read", "create", "delete", "patch"] {
            created.push(admin.create_permission("role", action).await.unwrap().id);
        }
        let batch = admin
            .create_permissions(&[
                PermissionKey::new("perm", "read"),
                PermissionKey::new("perm", "create"),
            ])
            .await
            .unwrap();
        created.extend(batch.iter().map(|p| p.id));

        let page = admin.list_permissions(PageParams::default()).await.unwrap();
        assert!(page.items.windows(2).all(|w| (w[0].created_at, w[0].id) < (w[1].created_at, w[1].id)));
        let listed: Vec<_> = page.items.iter().map(|p| p.id).collect();
        assert_eq!(listed[..4], created[..4]);
        assert_eq!(page.total, 6);
    }

    #[tokio::test]
    async fn delete_detaches_from_roles() {
        let (admin, _) = admin();
        let role = admin.create_role("auditor", None).await.unwrap();
        let read = admin.create_permission("perm", "read").await.unwrap();
        admin.add_permissions_to_role(role, &[read.id]).await.unwrap();

        admin.delete_permission(read.id).await.unwrap();
        assert!(admin.permissions_for_roles(&[role]).await.unwrap().is_empty());
        assert!(admin.get_permissions(&[read.id]).await.unwrap().is_empty());

        let err = admin.delete_permission(read.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn permissions_for_roles_is_a_distinct_union() {
        let (admin, _) = admin();
        let a = admin.create_role("a", None).await.unwrap();
        let b = admin.create_role("b", None).await.unwrap();
        let read = admin.create_permission("perm", "read").await.unwrap();
        let delete = admin.create_permission("perm", "delete").await.unwrap();
        admin.add_permissions_to_role(a, &[read.id]).await.unwrap();
        admin.add_permissions_to_role(b, &[read.id, delete.id]).await.unwrap();

        let union = admin.permissions_for_roles(&[a, b]).await.unwrap();
        assert_eq!(union.len(), 2);
    }
}
