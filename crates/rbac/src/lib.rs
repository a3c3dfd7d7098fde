//! `warden-rbac` provides role-based access control shared across services.
//!
//! This crate is intentionally decoupled from transport and from any concrete
//! database: persistence is reached only through [`RoleStore`] and
//! [`PermissionStore`].

pub mod admin;
pub mod authorize;
pub mod bootstrap;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod permission;
pub mod role;
pub mod store;

pub use admin::RbacAdmin;
pub use authorize::{Authorizer, Decision, Denial, Evaluation, PermissionSet};
pub use bootstrap::BootstrapReport;
pub use catalog::{CatalogBuilder, PermissionCatalog, build_permission_catalog};
pub use codec::{CodecError, PermissionCode, decode};
pub use config::RbacConfig;
pub use permission::{Permission, PermissionKey};
pub use role::{Role, RolePatch, WellKnownRole};
pub use store::{InMemoryRbacStore, PermissionStore, RoleStore, StoreError};
