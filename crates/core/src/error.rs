//! Domain error model.

use thiserror::Error;

/// Result type used across the RBAC core.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every storage or infrastructure failure is translated into one of these
/// kinds exactly once, at the boundary of the operation that observed it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed identifiers or missing required fields (no storage call made).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced role, permission or pairing does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The authorization check failed.
    #[error("unauthorized")]
    Unauthorized,

    /// Any other storage/infrastructure failure, including deployment
    /// preconditions such as an unseeded well-known role.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`DomainError`], for mapping onto transport
/// status codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    Internal,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::Unauthorized => ErrorKind::Unauthorized,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }
}
