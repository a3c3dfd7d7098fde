//! Role catalog entities, partial updates and the well-known roles.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use warden_core::{DomainError, DomainResult, RoleId};

use crate::codec::PermissionCode;
use crate::permission::Permission;

/// A named bundle of permissions.
///
/// `permissions` is materialized by the store from the role-permission
/// association; the role references permissions, it does not own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Build a new, validated role with a fresh id and no permissions.
    pub fn new(name: impl Into<String>, description: Option<String>) -> DomainResult<Self> {
        let name = validate_name(name.into())?;
        Ok(Self {
            id: RoleId::new(),
            name,
            description,
            permissions: Vec::new(),
            created_at: Utc::now(),
        })
    }

    pub fn permission_codes(&self) -> BTreeSet<PermissionCode> {
        self.permissions.iter().map(Permission::code).collect()
    }

    pub fn well_known(&self) -> Option<WellKnownRole> {
        WellKnownRole::from_name(&self.name)
    }
}

fn validate_name(name: String) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("role name is required"));
    }
    Ok(trimmed.to_string())
}

/// Partial update of a role.
///
/// `None` leaves a field untouched. For `description`, `Some(None)` clears it
/// and `Some(Some(_))` replaces it. On the wire, an absent field is omitted
/// and `null` means cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub description: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl RolePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    /// Normalize and validate the supplied fields.
    pub fn validated(self) -> DomainResult<Self> {
        let name = self.name.map(validate_name).transpose()?;
        Ok(Self {
            name,
            description: self.description,
        })
    }

    /// Apply only the supplied fields to `role`.
    pub fn apply(&self, role: &mut Role) {
        if let Some(name) = &self.name {
            role.name = name.clone();
        }
        if let Some(description) = &self.description {
            role.description = description.clone();
        }
    }
}

/// Roles every deployment must have exactly one of.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellKnownRole {
    /// Granted to every newly created user.
    Default,
    /// Granted to administrative users; superset of all permissions.
    Super,
}

impl WellKnownRole {
    pub const ALL: [WellKnownRole; 2] = [WellKnownRole::Default, WellKnownRole::Super];

    pub fn name(self) -> &'static str {
        match self {
            WellKnownRole::Default => "default",
            WellKnownRole::Super => "super",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WellKnownRole::Default => "Granted to every user on creation",
            WellKnownRole::Super => "Full administrative access, including destructive operations",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }
}

impl core::fmt::Display for WellKnownRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
