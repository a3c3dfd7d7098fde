//! Runtime configuration for the RBAC services.

use std::time::Duration;

use warden_core::page::MAX_PAGE_SIZE;

pub const STORE_TIMEOUT_ENV: &str = "WARDEN_STORE_TIMEOUT_MS";
pub const MAX_PAGE_SIZE_ENV: &str = "WARDEN_MAX_PAGE_SIZE";

/// Settings read once at startup and shared by the admin and authorization
/// services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RbacConfig {
    /// Deadline applied to each storage round-trip (`None` = no deadline).
    pub store_timeout: Option<Duration>,
    /// Upper bound for list page sizes.
    pub max_page_size: u32,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            store_timeout: None,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl RbacConfig {
    /// Load from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unparseable values are logged and
    /// replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let store_timeout = match lookup(STORE_TIMEOUT_ENV) {
            None => defaults.store_timeout,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(_) => {
                    tracing::warn!(key = STORE_TIMEOUT_ENV, value = %raw, "invalid value; no store deadline");
                    defaults.store_timeout
                }
            },
        };

        let max_page_size = match lookup(MAX_PAGE_SIZE_ENV) {
            None => defaults.max_page_size,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(key = MAX_PAGE_SIZE_ENV, value = %raw, "invalid value; using default");
                    defaults.max_page_size
                }
            },
        };

        Self {
            store_timeout,
            max_page_size,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }
}
