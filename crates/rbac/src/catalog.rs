//! Static permission tables.
//!
//! A service declares the `(resource, action)` pairs it recognizes once, at
//! startup, and gets back an immutable [`PermissionCatalog`]. Bootstrap seeds
//! the store from it and grants the well-known roles their subsets.

use std::collections::{BTreeMap, BTreeSet};

use warden_core::{DomainError, DomainResult};

use crate::codec::PermissionCode;
use crate::permission::PermissionKey;

/// Immutable table of every permission a service recognizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCatalog {
    resources: BTreeMap<String, BTreeMap<String, PermissionCode>>,
    default_grants: BTreeSet<PermissionCode>,
}

impl PermissionCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Code for a registered pair.
    pub fn code(&self, resource: &str, action: &str) -> Option<&PermissionCode> {
        self.resources.get(resource)?.get(action)
    }

    /// Codes of one resource keyed by action.
    pub fn resource(&self, resource: &str) -> Option<&BTreeMap<String, PermissionCode>> {
        self.resources.get(resource)
    }

    pub fn contains(&self, code: &PermissionCode) -> bool {
        code.decode()
            .ok()
            .and_then(|(r, a)| self.code(r, a))
            .is_some()
    }

    /// Every registered pair, ordered by resource then action.
    pub fn keys(&self) -> Vec<PermissionKey> {
        self.resources
            .iter()
            .flat_map(|(resource, actions)| {
                actions
                    .keys()
                    .map(move |action| PermissionKey::new(resource.clone(), action.clone()))
            })
            .collect()
    }

    /// The intentionally small, read-oriented subset for the default role.
    pub fn default_grants(&self) -> &BTreeSet<PermissionCode> {
        &self.default_grants
    }

    /// Everything; the super role holds the full catalog.
    pub fn super_grants(&self) -> BTreeSet<PermissionCode> {
        self.resources
            .values()
            .flat_map(|actions| actions.values().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct CatalogBuilder {
    keys: Vec<PermissionKey>,
    default_grants: Vec<PermissionKey>,
}

impl CatalogBuilder {
    /// Register `actions` under `resource`.
    pub fn resource(mut self, resource: &str, actions: &[&str]) -> Self {
        self.keys
            .extend(actions.iter().map(|action| PermissionKey::new(resource, *action)));
        self
    }

    /// Add registered pairs to the default role's grant set.
    pub fn grant_default(mut self, resource: &str, actions: &[&str]) -> Self {
        self.default_grants
            .extend(actions.iter().map(|action| PermissionKey::new(resource, *action)));
        self
    }

    /// Validate every pair and freeze the table.
    pub fn build(self) -> DomainResult<PermissionCatalog> {
        let mut resources: BTreeMap<String, BTreeMap<String, PermissionCode>> = BTreeMap::new();
        for key in self.keys {
            key.validate()?;
            let code = key.code();
            let actions = resources.entry(key.resource).or_default();
            if actions.insert(key.action, code.clone()).is_some() {
                return Err(DomainError::conflict(format!(
                    "permission '{code}' registered twice"
                )));
            }
        }

        let mut default_grants = BTreeSet::new();
        for key in self.default_grants {
            let code = key.code();
            let registered = resources
                .get(&key.resource)
                .is_some_and(|actions| actions.contains_key(&key.action));
            if !registered {
                return Err(DomainError::validation(format!(
                    "default grant '{code}' is not a registered permission"
                )));
            }
            default_grants.insert(code);
        }

        Ok(PermissionCatalog {
            resources,
            default_grants,
        })
    }
}

/// Resource covering authorization checks and destructive user operations.
pub const AUTHZ: &str = "authZ";
/// Resource covering the permission catalog.
pub const PERM: &str = "perm";
/// Resource covering roles and their permission sets.
pub const ROLE: &str = "role";
/// Resource covering user-role assignments.
pub const USER_ROLE: &str = "user-role";

/// The permission table of the RBAC service itself.
pub fn build_permission_catalog() -> DomainResult<PermissionCatalog> {
    PermissionCatalog::builder()
        .resource(AUTHZ, &["check", "delete-user", "promote-super"])
        .resource(PERM, &["read", "create", "delete"])
        .resource(
            ROLE,
            &[
                "read",
                "create",
                "patch",
                "delete",
                "add-permissions",
                "remove-permissions",
            ],
        )
        .resource(USER_ROLE, &["read", "add", "remove"])
        .grant_default(AUTHZ, &["check"])
        .grant_default(PERM, &["read"])
        .grant_default(ROLE, &["read"])
        .build()
}
