//! Offset pagination shared by every list operation.

use serde::{Deserialize, Serialize};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Hard ceiling applied when no tighter bound is configured.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    /// Maximum number of items to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl PageParams {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        }
    }

    /// Clamp the limit to `max` (a zero limit becomes 1).
    pub fn clamped(self, max: u32) -> Self {
        Self {
            limit: self.limit.clamp(1, max.max(1)),
            offset: self.offset,
        }
    }

    /// Slice one page out of an already ordered collection.
    pub fn paginate<T: Clone>(self, ordered: &[T]) -> Page<T> {
        let total = ordered.len() as u64;
        let items: Vec<T> = ordered
            .iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .cloned()
            .collect();
        Page::new(items, total, self)
    }
}

/// One page of a list result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    pub params: PageParams,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, params: PageParams) -> Self {
        let has_more = total > u64::from(params.offset) + u64::from(params.limit);
        Self {
            items,
            total,
            params,
            has_more,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            params: self.params,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_defaults_and_cap() {
        assert_eq!(PageParams::new(None, None), PageParams::default());
        assert_eq!(PageParams::new(Some(5000), Some(3)).limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn clamped_never_yields_empty_limit() {
        let p = PageParams { limit: 0, offset: 0 }.clamped(10);
        assert_eq!(p.limit, 1);
        let p = PageParams { limit: 500, offset: 0 }.clamped(10);
        assert_eq!(p.limit, 10);
    }

    #[test]
    fn paginate_reports_has_more() {
        let data: Vec<u32> = (0..7).collect();

        let first = PageParams { limit: 3, offset: 0 }.paginate(&data);
        assert_eq!(first.items, vec![0, 1, 2]);
        assert_eq!(first.total, 7);
        assert!(first.has_more);

        let last = PageParams { limit: 3, offset: 6 }.paginate(&data);
        assert_eq!(last.items, vec![6]);
        assert!(!last.has_more);

        let past_end = PageParams { limit: 3, offset: 10 }.paginate(&data);
        assert!(past_end.items.is_empty());
        assert!(!past_end.has_more);
    }
}
