//! Page-number pagination.
//!
//! Pages are 1-based. A missing, zero or non-numeric `page_size` falls back to the
//! default; anything above the maximum is clamped. A page past the end of the result
//! set is an error, except page 1 of an empty set.

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::{ConsultError, ConsultResult};

/// Message returned for out-of-range or malformed page numbers.
pub const INVALID_PAGE: &str = "Invalid page.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Builds a request from raw query-string values.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when `page` is present but is not a positive integer.
    pub fn from_query(page: Option<&str>, page_size: Option<&str>) -> ConsultResult<Self> {
        let page = match page.map(str::trim) {
            None | Some("") => 1,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(ConsultError::NotFound(INVALID_PAGE.into())),
            },
        };

        let page_size = page_size
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .map(|n| n.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Rejects pages that start beyond `count` rows.
    pub fn ensure_in_range(&self, count: u64) -> ConsultResult<()> {
        if self.page > 1 && self.offset() >= count {
            return Err(ConsultError::NotFound(INVALID_PAGE.into()));
        }
        Ok(())
    }
}

/// One page of results plus the total row count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub count: u64,
    pub request: PageRequest,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.request.offset() + (self.items.len() as u64) < self.count
    }

    pub fn has_previous(&self) -> bool {
        self.request.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            request: self.request,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_query_is_empty() {
        let req = PageRequest::from_query(None, None).unwrap();
        assert_eq!(req, PageRequest::default());
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn page_size_is_clamped_and_sanitised() {
        assert_eq!(PageRequest::from_query(None, Some("5")).unwrap().page_size, 5);
        assert_eq!(PageRequest::from_query(None, Some("500")).unwrap().page_size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::from_query(None, Some("0")).unwrap().page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::from_query(None, Some("ten")).unwrap().page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn malformed_page_is_not_found() {
        for raw in ["0", "-1", "two"] {
            assert!(matches!(
                PageRequest::from_query(Some(raw), None),
                Err(ConsultError::NotFound(_))
            ));
        }
    }

    #[test]
    fn range_check_allows_empty_first_page() {
        let first = PageRequest::default();
        assert!(first.ensure_in_range(0).is_ok());

        let third = PageRequest { page: 3, page_size: 10 };
        assert!(third.ensure_in_range(21).is_ok());
        assert!(third.ensure_in_range(20).is_err());
    }

    #[test]
    fn next_and_previous_flags() {
        let page = Page {
            count: 15,
            request: PageRequest::default(),
            items: vec![0; 10],
        };
        assert!(page.has_next());
        assert!(!page.has_previous());

        let page = Page {
            count: 15,
            request: PageRequest { page: 2, page_size: 10 },
            items: vec![0; 5],
        };
        assert!(!page.has_next());
        assert!(page.has_previous());
    }
}
