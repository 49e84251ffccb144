//! Page/limit pagination math shared by list endpoints.

use serde::{Deserialize, Serialize};

/// A requested page, clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page request from optional query parameters.
    ///
    /// Missing or zero values fall back to page 1 and the default limit;
    /// limits above [`Self::MAX_LIMIT`] are capped.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT);
        Self { page, limit }
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Row offset for SQL `OFFSET`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    /// Describe this page given the total number of matching rows.
    #[must_use]
    pub fn info(&self, total_count: i64) -> PageInfo {
        let total_count = total_count.max(0);
        let limit = i64::from(self.limit);
        let total_pages = (total_count + limit - 1) / limit;
        let current_page = i64::from(self.page);
        PageInfo {
            current_page,
            total_pages,
            total_count,
            has_next: current_page < total_pages,
            has_previous: current_page > 1,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination block returned alongside list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let req = PageRequest::new(None, None);
        assert_eq!((req.page(), req.limit()), (1, 20));

        let req = PageRequest::new(Some(0), Some(500));
        assert_eq!((req.page(), req.limit()), (1, 100));
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(Some(3), Some(10)).offset(), 20);
        assert_eq!(PageRequest::new(Some(1), Some(10)).offset(), 0);
    }

    #[test]
    fn test_info_middle_page() {
        let info = PageRequest::new(Some(2), Some(10)).info(35);
        assert_eq!(info.total_pages, 4);
        assert_eq!(info.total_count, 35);
        assert!(info.has_next);
        assert!(info.has_previous);
    }

    #[test]
    fn test_info_empty_result() {
        let info = PageRequest::default().info(0);
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next);
        assert!(!info.has_previous);
    }

    #[test]
    fn test_info_last_page() {
        let info = PageRequest::new(Some(4), Some(10)).info(40);
        assert_eq!(info.total_pages, 4);
        assert!(!info.has_next);
    }
}
