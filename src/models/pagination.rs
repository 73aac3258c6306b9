//! Page-number pagination

use serde::Serialize;

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u32 = 6;
/// Upper bound for the `limit` override
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub limit: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Offset for database queries
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }

    /// Limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

/// One page of results plus the total count
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            limit: params.limit,
        }
    }

    /// Total number of pages (at least one, even when empty)
    pub fn total_pages(&self) -> u32 {
        let total = u32::try_from(self.total.max(0)).unwrap_or(u32::MAX);
        total.div_ceil(self.limit.max(1)).max(1)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// A page past the last one. Page 1 is always in range.
    pub fn is_out_of_range(&self) -> bool {
        self.page > self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_list_params_defaults() {
        let params = ListParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 6);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_list_params_clamped() {
        let params = ListParams::new(0, 0);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 1);

        let params = ListParams::new(3, 1000);
        assert_eq!(params.limit, MAX_PAGE_SIZE);
        assert_eq!(params.offset(), 200);
    }

    #[test]
    fn test_paged_result_navigation() {
        let params = ListParams::new(2, 6);
        let page = PagedResult::new(vec![1, 2, 3], 15, &params);

        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_prev());
        assert!(!page.is_out_of_range());
    }

    #[test]
    fn test_empty_first_page_in_range() {
        let page: PagedResult<i32> = PagedResult::new(vec![], 0, &ListParams::default());
        assert!(!page.is_out_of_range());
        assert!(!page.has_next());
        assert!(!page.has_prev());
    }

    #[test]
    fn test_page_past_end_out_of_range() {
        let page: PagedResult<i32> = PagedResult::new(vec![], 6, &ListParams::new(2, 6));
        assert!(page.is_out_of_range());
    }

    proptest! {
        #[test]
        fn prop_offset_matches_page(page in 1u32..1000, limit in 1u32..=100) {
            let params = ListParams::new(page, limit);
            prop_assert_eq!(params.offset(), i64::from(page - 1) * i64::from(limit));
        }

        #[test]
        fn prop_last_page_has_no_next(total in 0i64..500, limit in 1u32..=100) {
            let params = ListParams::new(1, limit);
            let sizing: PagedResult<()> = PagedResult::new(vec![], total, &params);
            let last = ListParams::new(sizing.total_pages(), limit);
            let page: PagedResult<()> = PagedResult::new(vec![], total, &last);
            prop_assert!(!page.has_next());
            prop_assert!(!page.is_out_of_range());
        }
    }
}
