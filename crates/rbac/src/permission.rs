//! Permission catalog entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{DomainError, DomainResult, PermissionId};

use crate::codec::{PermissionCode, SEPARATOR};

/// The `(resource, action)` pair that identifies a permission.
///
/// Globally unique across the permission catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    pub resource: String,
    pub action: String,
}

impl PermissionKey {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Reject empty parts and parts containing the code separator, which would
    /// make the encoded code ambiguous.
    pub fn validate(&self) -> DomainResult<()> {
        for (field, value) in [("resource", &self.resource), ("action", &self.action)] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("permission {field} is required")));
            }
            if value.contains(SEPARATOR) {
                return Err(DomainError::validation(format!(
                    "permission {field} '{value}' must not contain '{SEPARATOR}'"
                )));
            }
        }
        Ok(())
    }

    pub fn code(&self) -> PermissionCode {
        PermissionCode::encode(&self.resource, &self.action)
    }
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}{}", self.resource, SEPARATOR, self.action)
    }
}

/// A permission recognized by the deployment. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub resource: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    /// Build a new, validated permission with a fresh id.
    pub fn new(key: PermissionKey) -> DomainResult<Self> {
        key.validate()?;
        Ok(Self {
            id: PermissionId::new(),
            resource: key.resource,
            action: key.action,
            created_at: Utc::now(),
        })
    }

    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(self.resource.clone(), self.action.clone())
    }

    pub fn code(&self) -> PermissionCode {
        PermissionCode::encode(&self.resource, &self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ErrorKind;

    #[test]
    fn new_permission_encodes_its_code() {
        let p = Permission::new(PermissionKey::new("perm", "read")).unwrap();
        assert_eq!(p.code().as_str(), "perm:read");
        assert_eq!(p.key().to_string(), "perm:read");
    }

    #[test]
    fn empty_parts_are_rejected() {
        let err = Permission::new(PermissionKey::new("", "read")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = Permission::new(PermissionKey::new("perm", "  ")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn separator_in_parts_is_rejected() {
        let err = PermissionKey::new("a:b", "read").validate().unwrap_err();
        assert!(err.to_string().contains("resource"));
        let err = PermissionKey::new("perm", "read:all").validate().unwrap_err();
        assert!(err.to_string().contains("action"));
    }
}
