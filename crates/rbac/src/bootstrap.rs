//! One-time deployment bootstrap of the well-known roles.
//!
//! Ordering: roles exist, then the catalog is seeded, then each well-known
//! role is granted its subset. Re-running only fills in what is missing.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use warden_core::{DomainError, DomainResult, PermissionId, RoleId};

use crate::admin::RbacAdmin;
use crate::catalog::PermissionCatalog;
use crate::codec::PermissionCode;
use crate::permission::PermissionKey;
use crate::role::WellKnownRole;
use crate::store::{PermissionStore, RoleStore};

/// What a bootstrap run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub roles_created: Vec<WellKnownRole>,
    pub permissions_seeded: usize,
    pub default_grants_added: usize,
    pub super_grants_added: usize,
}

impl BootstrapReport {
    pub fn is_noop(&self) -> bool {
        self.roles_created.is_empty()
            && self.permissions_seeded == 0
            && self.default_grants_added == 0
            && self.super_grants_added == 0
    }
}

impl<R, P> RbacAdmin<R, P>
where
    R: RoleStore,
    P: PermissionStore,
{
    /// Bring the store in line with `catalog`.
    #[tracing::instrument(skip(self, catalog), fields(catalog_size = catalog.len()), err(level = "debug"))]
    pub async fn bootstrap(&self, catalog: &PermissionCatalog) -> DomainResult<BootstrapReport> {
        let mut report = BootstrapReport::default();

        let default_role = self.ensure_role(WellKnownRole::Default, &mut report).await?;
        let super_role = self.ensure_role(WellKnownRole::Super, &mut report).await?;

        let (ids, seeded) = self.seed_catalog(catalog).await?;
        report.permissions_seeded = seeded;

        let default_ids = grant_ids(&ids, catalog.default_grants().iter())?;
        let super_ids = grant_ids(&ids, catalog.super_grants().iter())?;

        report.default_grants_added = self
            .grant_missing(WellKnownRole::Default, default_role, &default_ids)
            .await?;
        report.super_grants_added = self
            .grant_missing(WellKnownRole::Super, super_role, &super_ids)
            .await?;

        tracing::info!(?report, "bootstrap complete");
        Ok(report)
    }

    /// Resolve or create a well-known role, recording a creation in `report`.
    async fn ensure_role(
        &self,
        which: WellKnownRole,
        report: &mut BootstrapReport,
    ) -> DomainResult<RoleId> {
        match self.get_role_by_name(which.name()).await {
            Ok(role) => Ok(role.id),
            Err(DomainError::NotFound(_)) => {
                match self.create_role(which.name(), Some(which.description())).await {
                    Ok(id) => {
                        report.roles_created.push(which);
                        Ok(id)
                    }
                    // Lost a race with a concurrent bootstrap.
                    Err(DomainError::Conflict(_)) => {
                        Ok(self.get_role_by_name(which.name()).await?.id)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Create the catalog permissions not yet stored; map every code to its id.
    async fn seed_catalog(
        &self,
        catalog: &PermissionCatalog,
    ) -> DomainResult<(BTreeMap<PermissionCode, PermissionId>, usize)> {
        let keys = catalog.keys();
        let mut retried = false;
        loop {
            let mut ids: BTreeMap<PermissionCode, PermissionId> = self
                .find_permissions(&keys)
                .await?
                .into_iter()
                .map(|p| (p.code(), p.id))
                .collect();

            let missing: Vec<PermissionKey> = keys
                .iter()
                .filter(|k| !ids.contains_key(&k.code()))
                .cloned()
                .collect();
            if missing.is_empty() {
                return Ok((ids, 0));
            }

            match self.create_permissions(&missing).await {
                Ok(created) => {
                    let seeded = created.len();
                    ids.extend(created.into_iter().map(|p| (p.code(), p.id)));
                    return Ok((ids, seeded));
                }
                // A concurrent bootstrap stored some of them first; re-read once.
                Err(DomainError::Conflict(_)) if !retried => retried = true,
                Err(e) => return Err(e),
            }
        }
    }

    /// Grant `role_id` whichever of `wanted` it lacks; returns how many were added.
    async fn grant_missing(
        &self,
        which: WellKnownRole,
        role_id: RoleId,
        wanted: &[PermissionId],
    ) -> DomainResult<usize> {
        let mut retried = false;
        loop {
            let missing = self.missing_grants(role_id, wanted).await?;
            if missing.is_empty() {
                return Ok(0);
            }

            let granted = match which {
                WellKnownRole::Default => self.bootstrap_default_role_permissions(&missing).await,
                WellKnownRole::Super => self.bootstrap_super_role_permissions(&missing).await,
            };
            match granted {
                Ok(()) => return Ok(missing.len()),
                Err(DomainError::Conflict(_)) if !retried => retried = true,
                Err(e) => return Err(e),
            }
        }
    }

    async fn missing_grants(
        &self,
        role_id: RoleId,
        wanted: &[PermissionId],
    ) -> DomainResult<Vec<PermissionId>> {
        let held: BTreeSet<PermissionId> = self
            .permissions_for_roles(&[role_id])
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        Ok(wanted.iter().copied().filter(|id| !held.contains(id)).collect())
    }
}

fn grant_ids<'a>(
    ids: &BTreeMap<PermissionCode, PermissionId>,
    codes: impl Iterator<Item = &'a PermissionCode>,
) -> DomainResult<Vec<PermissionId>> {
    codes
        .map(|code| {
            ids.get(code)
                .copied()
                .ok_or_else(|| DomainError::internal(format!("permission '{code}' was not seeded")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use warden_core::{Page, PageParams, UserId};

    use super::*;
    use crate::admin::tests::admin;
    use crate::catalog::build_permission_catalog;
    use crate::config::RbacConfig;
    use crate::permission::Permission;
    use crate::role::{Role, RolePatch};
    use crate::store::{InMemoryRbacStore, StoreError};

    /// Lets a rival writer land its first batch just before ours.
    #[derive(Default)]
    struct RacedStore {
        inner: InMemoryRbacStore,
        seed_raced: AtomicBool,
        grant_raced: AtomicBool,
    }

    #[async_trait]
    impl RoleStore for RacedStore {
        async fn find_by_ids(&self, ids: &[RoleId]) -> Result<Vec<Role>, StoreError> {
            RoleStore::find_by_ids(&self.inner, ids).await
        }

        async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Role>, StoreError> {
            self.inner.find_by_user_id(user_id).await
        }

        async fn find_by_name(&self, name: &str) -> Result<Role, StoreError> {
            self.inner.find_by_name(name).await
        }

        async fn list(&self, params: PageParams) -> Result<Page<Role>, StoreError> {
            RoleStore::list(&self.inner, params).await
        }

        async fn create(&self, role: &Role) -> Result<(), StoreError> {
            RoleStore::create(&self.inner, role).await
        }

        async fn patch(&self, id: RoleId, patch: &RolePatch) -> Result<Role, StoreError> {
            self.inner.patch(id, patch).await
        }

        async fn delete(&self, id: RoleId) -> Result<(), StoreError> {
            RoleStore::delete(&self.inner, id).await
        }

        async fn add_permissions(
            &self,
            role_id: RoleId,
            permission_ids: &[PermissionId],
        ) -> Result<(), StoreError> {
            if !self.grant_raced.swap(true, Ordering::SeqCst) {
                self.inner.add_permissions(role_id, &permission_ids[..1]).await?;
            }
            self.inner.add_permissions(role_id, permission_ids).await
        }

        async fn remove_permissions(
            &self,
            role_id: RoleId,
            permission_ids: &[PermissionId],
        ) -> Result<(), StoreError> {
            self.inner.remove_permissions(role_id, permission_ids).await
        }

        async fn add_user(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<(), StoreError> {
            self.inner.add_user(user_id, role_ids).await
        }

        async fn remove_user(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<(), StoreError> {
            self.inner.remove_user(user_id, role_ids).await
        }
    }

    #[async_trait]
    impl PermissionStore for RacedStore {
        async fn create(&self, permission: &Permission) -> Result<(), StoreError> {
            PermissionStore::create(&self.inner, permission).await
        }

        async fn create_many(&self, permissions: &[Permission]) -> Result<(), StoreError> {
            if !self.seed_raced.swap(true, Ordering::SeqCst) {
                let rival = Permission::new(permissions[0].key()).map_err(|e| StoreError::Storage(e.to_string()))?;
                PermissionStore::create(&self.inner, &rival).await?;
            }
            self.inner.create_many(permissions).await
        }

        async fn find_by_ids(&self, ids: &[PermissionId]) -> Result<Vec<Permission>, StoreError> {
            PermissionStore::find_by_ids(&self.inner, ids).await
        }

        async fn find_by_role_ids(&self, role_ids: &[RoleId]) -> Result<Vec<Permission>, StoreError> {
            self.inner.find_by_role_ids(role_ids).await
        }

        async fn find_by_keys(&self, keys: &[PermissionKey]) -> Result<Vec<Permission>, StoreError> {
            self.inner.find_by_keys(keys).await
        }

        async fn list(&self, params: PageParams) -> Result<Page<Permission>, StoreError> {
            PermissionStore::list(&self.inner, params).await
        }

        async fn delete(&self, id: PermissionId) -> Result<(), StoreError> {
            PermissionStore::delete(&self.inner, id).await
        }
    }

    async fn codes_of(admin: &crate::admin::tests::TestAdmin, which: WellKnownRole) -> BTreeSet<PermissionCode> {
        admin.well_known_role(which).await.unwrap().permission_codes()
    }

    #[tokio::test]
    async fn bootstrap_seeds_roles_catalog_and_grants() {
        let (admin, _) = admin();
        let catalog = build_permission_catalog().unwrap();

        let report = admin.bootstrap(&catalog).await.unwrap();
        assert_eq!(report.roles_created, WellKnownRole::ALL.to_vec());
        assert_eq!(report.permissions_seeded, catalog.len());
        assert_eq!(report.default_grants_added, catalog.default_grants().len());
        assert_eq!(report.super_grants_added, catalog.len());

        assert_eq!(&codes_of(&admin, WellKnownRole::Default).await, catalog.default_grants());
        assert_eq!(codes_of(&admin, WellKnownRole::Super).await, catalog.super_grants());
    }

    #[tokio::test]
    async fn rerun_is_a_noop() {
        let (admin, store) = admin();
        let catalog = build_permission_catalog().unwrap();
        admin.bootstrap(&catalog).await.unwrap();
        let rows = store.role_permission_count().unwrap();

        let report = admin.bootstrap(&catalog).await.unwrap();
        assert!(report.is_noop(), "{report:?}");
        assert_eq!(store.role_permission_count().unwrap(), rows);
    }

    #[tokio::test]
    async fn partial_state_is_completed() {
        let (admin, _) = admin();
        admin.create_role("super", None).await.unwrap();
        let read = admin.create_permission("perm", "read").await.unwrap();
        admin.bootstrap_super_role_permissions(&[read.id]).await.unwrap();

        let catalog = build_permission_catalog().unwrap();
        let report = admin.bootstrap(&catalog).await.unwrap();
        assert_eq!(report.roles_created, vec![WellKnownRole::Default]);
        assert_eq!(report.permissions_seeded, catalog.len() - 1);
        assert_eq!(report.super_grants_added, catalog.len() - 1);
        assert_eq!(codes_of(&admin, WellKnownRole::Super).await, catalog.super_grants());
    }

    #[tokio::test]
    async fn extended_catalog_adds_new_permissions() {
        let (admin, _) = admin();
        admin.bootstrap(&build_permission_catalog().unwrap()).await.unwrap();

        let extended = PermissionCatalog::builder()
            .resource("perm", &["read", "create", "delete", "export"])
            .grant_default("perm", &["read"])
            .build()
            .unwrap();
        let report = admin.bootstrap(&extended).await.unwrap();
        assert_eq!(report.permissions_seeded, 1);
        assert_eq!(report.super_grants_added, 1);
        assert_eq!(report.default_grants_added, 0);
    }

    #[tokio::test]
    async fn bootstrap_recovers_when_a_concurrent_run_writes_first() {
        let store = Arc::new(RacedStore::default());
        let admin = RbacAdmin::new(store.clone(), store.clone(), RbacConfig::default());
        let catalog = build_permission_catalog().unwrap();

        let report = admin.bootstrap(&catalog).await.unwrap();
        assert_eq!(report.permissions_seeded, catalog.len() - 1);
        assert_eq!(report.default_grants_added, catalog.default_grants().len() - 1);
        assert_eq!(report.super_grants_added, catalog.len());

        let basic = admin.well_known_role(WellKnownRole::Default).await.unwrap();
        assert_eq!(&basic.permission_codes(), catalog.default_grants());
        let everything = admin.well_known_role(WellKnownRole::Super).await.unwrap();
        assert_eq!(everything.permission_codes(), catalog.super_grants());
    }
}
