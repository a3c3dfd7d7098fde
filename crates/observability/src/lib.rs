//! Process-wide tracing setup shared by every binary embedding the RBAC core.

/// Tracing subscriber configuration (filters, formatting).
pub mod tracing;

/// Initialize process-wide observability with the `RUST_LOG` filter
/// (default `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}
