//! Permission codec: `(resource, action)` <-> `"resource:action"`.
//!
//! The code string is the only cross-boundary representation of a permission
//! requirement. It is compared by exact string equality at decision time.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::DomainError;

/// Separator between resource and action. Never escaped.
pub const SEPARATOR: char = ':';

/// Canonical permission code (e.g. `"role:create"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(Cow<'static, str>);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed permission code '{0}': missing ':' separator")]
    MissingSeparator(String),
}

impl From<CodecError> for DomainError {
    fn from(value: CodecError) -> Self {
        DomainError::validation(value.to_string())
    }
}

impl PermissionCode {
    /// Encode a `(resource, action)` pair. Total: any strings are accepted, so
    /// a resource containing `:` yields a code that does not decode back.
    pub fn encode(resource: &str, action: &str) -> Self {
        let mut code = String::with_capacity(resource.len() + action.len() + 1);
        code.push_str(resource);
        code.push(SEPARATOR);
        code.push_str(action);
        Self(Cow::Owned(code))
    }

    /// Encode every action of one resource, keyed by action.
    pub fn full_encode<'a, I>(resource: &str, actions: I) -> BTreeMap<String, PermissionCode>
    where
        I: IntoIterator<Item = &'a str>,
    {
        actions
            .into_iter()
            .map(|action| (action.to_string(), Self::encode(resource, action)))
            .collect()
    }

    /// Wrap a compile-time code without validation.
    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    /// Split the code at its first separator.
    pub fn decode(&self) -> Result<(&str, &str), CodecError> {
        decode(self.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Split a wire code into `(resource, action)` at the first `:`.
pub fn decode(code: &str) -> Result<(&str, &str), CodecError> {
    code.split_once(SEPARATOR)
        .ok_or_else(|| CodecError::MissingSeparator(code.to_string()))
}

impl core::str::FromStr for PermissionCode {
    type Err = CodecError;

    /// Parse a wire code; rejects strings without a separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)?;
        Ok(Self(Cow::Owned(s.to_string())))
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        decode(&value)?;
        Ok(Self(Cow::Owned(value)))
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.0.into_owned()
    }
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PermissionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
