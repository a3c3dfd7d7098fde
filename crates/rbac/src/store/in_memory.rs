//! In-memory RBAC store for tests/dev.
//!
//! Both store traits share one table set behind a single lock, so every batch
//! is validated in full before any row is written.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::{Page, PageParams, PermissionId, RoleId, UserId};

use super::{PermissionStore, RoleStore, StoreError};
use crate::permission::{Permission, PermissionKey};
use crate::role::{Role, RolePatch};

#[derive(Debug, Default)]
struct Tables {
    /// Role rows; `permissions` is always empty here and filled on read.
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,
    role_permissions: BTreeMap<(RoleId, PermissionId), DateTime<Utc>>,
    user_roles: BTreeMap<(UserId, RoleId), DateTime<Utc>>,
}

impl Tables {
    fn materialize(&self, row: &Role) -> Role {
        let mut permissions: Vec<Permission> = self
            .role_permissions
            .keys()
            .filter(|(role_id, _)| *role_id == row.id)
            .filter_map(|(_, permission_id)| self.permissions.get(permission_id).cloned())
            .collect();
        permissions.sort_by_key(|p| (p.created_at, p.id));

        Role {
            permissions,
            ..row.clone()
        }
    }

    fn name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        self.roles
            .values()
            .any(|r| r.name == name && Some(r.id) != except)
    }

    fn key_taken(&self, resource: &str, action: &str) -> bool {
        self.permissions
            .values()
            .any(|p| p.resource == resource && p.action == action)
    }

    fn require_role(&self, id: RoleId) -> Result<&Role, StoreError> {
        self.roles
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("role {id}")))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRbacStore {
    tables: RwLock<Tables>,
}

impl InMemoryRbacStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Storage("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Storage("in-memory store lock poisoned".to_string()))
    }

    /// Number of role-permission rows (for tests asserting no duplication).
    pub fn role_permission_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.role_permissions.len())
    }

    /// Number of user-role rows.
    pub fn user_role_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.user_roles.len())
    }

    /// Poison the table lock so every later call fails with `Storage`.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.tables.write();
            panic!("poisoning in-memory store");
        }));
    }
}

fn ordered<T: Clone, K: Ord>(rows: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by_key(|r| key(r));
    rows
}

#[async_trait]
impl RoleStore for InMemoryRbacStore {
    async fn find_by_ids(&self, ids: &[RoleId]) -> Result<Vec<Role>, StoreError> {
        let tables = self.read()?;
        let wanted: BTreeSet<RoleId> = ids.iter().copied().collect();
        let rows = ordered(
            wanted.iter().filter_map(|id| tables.roles.get(id)),
            |r| (r.created_at, r.id),
        );
        Ok(rows.into_iter().map(|r| tables.materialize(r)).collect())
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Role>, StoreError> {
        let tables = self.read()?;
        let rows = ordered(
            tables
                .user_roles
                .keys()
                .filter(|(u, _)| *u == user_id)
                .filter_map(|(_, role_id)| tables.roles.get(role_id)),
            |r| (r.created_at, r.id),
        );
        Ok(rows.into_iter().map(|r| tables.materialize(r)).collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Role, StoreError> {
        let tables = self.read()?;
        tables
            .roles
            .values()
            .find(|r| r.name == name)
            .map(|r| tables.materialize(r))
            .ok_or_else(|| StoreError::NotFound(format!("role named '{name}'")))
    }

    async fn list(&self, params: PageParams) -> Result<Page<Role>, StoreError> {
        let tables = self.read()?;
        let rows = ordered(tables.roles.values(), |r| (r.created_at, r.id));
        Ok(params.paginate(&rows).map(|r| tables.materialize(r)))
    }

    async fn create(&self, role: &Role) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.roles.contains_key(&role.id) {
            return Err(StoreError::Conflict(format!("role {} already exists", role.id)));
        }
        if tables.name_taken(&role.name, None) {
            return Err(StoreError::Conflict(format!(
                "role name '{}' already exists",
                role.name
            )));
        }
        let row = Role {
            permissions: Vec::new(),
            ..role.clone()
        };
        tables.roles.insert(row.id, row);
        Ok(())
    }

    async fn patch(&self, id: RoleId, patch: &RolePatch) -> Result<Role, StoreError> {
        let mut tables = self.write()?;
        tables.require_role(id)?;
        if let Some(name) = &patch.name {
            if tables.name_taken(name, Some(id)) {
                return Err(StoreError::Conflict(format!("role name '{name}' already exists")));
            }
        }
        let row = tables
            .roles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("role {id}")))?;
        patch.apply(row);
        let row = row.clone();
        Ok(tables.materialize(&row))
    }

    async fn delete(&self, id: RoleId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.roles.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("role {id}")));
        }
        tables.role_permissions.retain(|(role_id, _), _| *role_id != id);
        tables.user_roles.retain(|(_, role_id), _| *role_id != id);
        Ok(())
    }

    async fn add_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_role(role_id)?;

        let mut batch = BTreeSet::new();
        for permission_id in permission_ids {
            if !tables.permissions.contains_key(permission_id) {
                return Err(StoreError::NotFound(format!("permission {permission_id}")));
            }
            let pair = (role_id, *permission_id);
            if tables.role_permissions.contains_key(&pair) || !batch.insert(pair) {
                return Err(StoreError::Conflict(format!(
                    "permission {permission_id} already attached to role {role_id}"
                )));
            }
        }

        let now = Utc::now();
        for pair in batch {
            tables.role_permissions.insert(pair, now);
        }
        Ok(())
    }

    async fn remove_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_role(role_id)?;
        for permission_id in permission_ids {
            tables.role_permissions.remove(&(role_id, *permission_id));
        }
        Ok(())
    }

    async fn add_user(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<(), StoreError> {
        let mut tables = self.write()?;

        let mut batch = BTreeSet::new();
        for role_id in role_ids {
            tables.require_role(*role_id)?;
            let pair = (user_id, *role_id);
            if tables.user_roles.contains_key(&pair) || !batch.insert(pair) {
                return Err(StoreError::Conflict(format!(
                    "user {user_id} already has role {role_id}"
                )));
            }
        }

        let now = Utc::now();
        for pair in batch {
            tables.user_roles.insert(pair, now);
        }
        Ok(())
    }

    async fn remove_user(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        for role_id in role_ids {
            tables.user_roles.remove(&(user_id, *role_id));
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for InMemoryRbacStore {
    async fn create(&self, permission: &Permission) -> Result<(), StoreError> {
        self.create_many(std::slice::from_ref(permission)).await
    }

    async fn create_many(&self, permissions: &[Permission]) -> Result<(), StoreError> {
        let mut tables = self.write()?;

        let mut batch = BTreeSet::new();
        for p in permissions {
            let duplicate_in_batch = !batch.insert((p.resource.as_str(), p.action.as_str()));
            if duplicate_in_batch
                || tables.permissions.contains_key(&p.id)
                || tables.key_taken(&p.resource, &p.action)
            {
                return Err(StoreError::Conflict(format!(
                    "permission '{}' already exists",
                    p.code()
                )));
            }
        }

        for p in permissions {
            tables.permissions.insert(p.id, p.clone());
        }
        Ok(())
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> Result<Vec<Permission>, StoreError> {
        let tables = self.read()?;
        let wanted: BTreeSet<PermissionId> = ids.iter().copied().collect();
        Ok(ordered(
            wanted.iter().filter_map(|id| tables.permissions.get(id)).cloned(),
            |p| (p.created_at, p.id),
        ))
    }

    async fn find_by_role_ids(&self, role_ids: &[RoleId]) -> Result<Vec<Permission>, StoreError> {
        let tables = self.read()?;
        let roles: BTreeSet<RoleId> = role_ids.iter().copied().collect();
        let ids: BTreeSet<PermissionId> = tables
            .role_permissions
            .keys()
            .filter(|(role_id, _)| roles.contains(role_id))
            .map(|(_, permission_id)| *permission_id)
            .collect();
        Ok(ordered(
            ids.iter().filter_map(|id| tables.permissions.get(id)).cloned(),
            |p| (p.created_at, p.id),
        ))
    }

    async fn find_by_keys(&self, keys: &[PermissionKey]) -> Result<Vec<Permission>, StoreError> {
        let tables = self.read()?;
        let wanted: BTreeSet<(&str, &str)> = keys
            .iter()
            .map(|k| (k.resource.as_str(), k.action.as_str()))
            .collect();
        Ok(ordered(
            tables
                .permissions
                .values()
                .filter(|p| wanted.contains(&(p.resource.as_str(), p.action.as_str())))
                .cloned(),
            |p| (p.created_at, p.id),
        ))
    }

    async fn list(&self, params: PageParams) -> Result<Page<Permission>, StoreError> {
        let tables = self.read()?;
        let rows = ordered(tables.permissions.values().cloned(), |p| (p.created_at, p.id));
        Ok(params.paginate(&rows))
    }

    async fn delete(&self, id: PermissionId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.permissions.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("permission {id}")));
        }
        tables
            .role_permissions
            .retain(|(_, permission_id), _| *permission_id != id);
        Ok(())
    }
}
