use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// PageRequest
///
/// A validated `page`/`limit` pair. Both are 1-based and at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Parses raw query values. Absent values take the defaults, a `limit`
    /// above `MAX_LIMIT` is capped, anything non-numeric or zero is rejected.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> AppResult<Self> {
        let page = parse_positive("page", page, DEFAULT_PAGE)?;
        let limit = parse_positive("limit", limit, DEFAULT_LIMIT)?.min(MAX_LIMIT);
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

fn parse_positive(name: &str, raw: Option<&str>, default: u32) -> AppResult<u32> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(value) => value
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| AppError::validation(format!("{name} must be a positive integer"))),
    }
}

/// SortOrder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("desc") => Ok(SortOrder::Desc),
            Some("asc") => Ok(SortOrder::Asc),
            Some(_) => Err(AppError::validation("sortOrder must be 'asc' or 'desc'")),
        }
    }

    pub const fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Trims a free-text search term, treating blank input as absent.
pub fn normalize_search(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Page
///
/// One page of results as produced by the repository, before it is shaped
/// into the wire envelope.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    /// Cuts a page out of an already filtered and sorted collection.
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();
        Self {
            items,
            total,
            request,
        }
    }

    pub fn total_pages(&self) -> i64 {
        let limit = i64::from(self.request.limit);
        (self.total + limit - 1) / limit
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}

/// PaginatedResponse
///
/// The list envelope shared by every list endpoint:
/// `{success, items, totalPages, currentPage, total, hasNextPage, hasPrevPage}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub success: bool,
    pub items: Vec<T>,
    pub total_pages: i64,
    pub current_page: u32,
    pub total: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        let total_pages = page.total_pages();
        let current_page = page.request.page;
        Self {
            success: true,
            total_pages,
            current_page,
            total: page.total,
            has_next_page: i64::from(current_page) < total_pages,
            has_prev_page: current_page > 1,
            items: page.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        assert_eq!(PageRequest::parse(None, None).unwrap(), PageRequest::default());
        assert_eq!(PageRequest::parse(Some(""), Some(" ")).unwrap(), PageRequest::default());
    }

    #[test]
    fn test_page_request_rejects_zero_and_garbage() {
        assert!(PageRequest::parse(Some("0"), None).is_err());
        assert!(PageRequest::parse(None, Some("ten")).is_err());
        assert!(PageRequest::parse(Some("-1"), None).is_err());
    }

    #[test]
    fn test_limit_is_capped() {
        let request = PageRequest::parse(Some("2"), Some("1000")).unwrap();
        assert_eq!(request.limit, MAX_LIMIT);
        assert_eq!(request.offset(), i64::from(MAX_LIMIT));
    }

    #[test]
    fn test_envelope_flags() {
        let request = PageRequest { page: 2, limit: 2 };
        let page = Page::slice(vec![1, 2, 3, 4, 5], request);
        assert_eq!(page.items, vec![3, 4]);

        let envelope = PaginatedResponse::from(page);
        assert_eq!(envelope.total_pages, 3);
        assert_eq!(envelope.total, 5);
        assert!(envelope.has_next_page);
        assert!(envelope.has_prev_page);
    }

    #[test]
    fn test_empty_collection_has_zero_pages() {
        let envelope = PaginatedResponse::from(Page::<u8>::slice(vec![], PageRequest::default()));
        assert_eq!(envelope.total_pages, 0);
        assert!(!envelope.has_next_page);
        assert!(!envelope.has_prev_page);
    }
}
