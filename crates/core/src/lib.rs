//! `warden-core`: shared ids, errors and paging for the RBAC crates.
//!
//! This crate contains **pure** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod page;

pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{PermissionId, RoleId, UserId};
pub use page::{Page, PageParams};
