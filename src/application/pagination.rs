//! Offset pagination for item listings.

use std::num::NonZeroUsize;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("\"limit\" must be a positive integer, got `{0}`")]
    InvalidLimit(String),
    #[error("\"page\" must be a positive integer, got `{0}`")]
    InvalidPage(String),
}

/// The slice of a filtered listing a request asks for.
///
/// `limit: None` means "everything"; pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: Option<NonZeroUsize>,
    page: NonZeroUsize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl PageRequest {
    pub fn unbounded() -> Self {
        Self {
            limit: None,
            page: NonZeroUsize::MIN,
        }
    }

    pub fn new(limit: NonZeroUsize, page: NonZeroUsize) -> Self {
        Self {
            limit: Some(limit),
            page,
        }
    }

    /// Build a request from raw query values.
    ///
    /// A `page` without a `limit` pages through `default_page_size` items.
    pub fn from_params(
        limit: Option<&str>,
        page: Option<&str>,
        default_page_size: NonZeroUsize,
    ) -> Result<Self, PaginationError> {
        let limit = limit
            .map(|raw| parse_positive(raw).ok_or_else(|| PaginationError::InvalidLimit(raw.to_string())))
            .transpose()?;
        let page = page
            .map(|raw| parse_positive(raw).ok_or_else(|| PaginationError::InvalidPage(raw.to_string())))
            .transpose()?;

        Ok(match (limit, page) {
            (None, None) => Self::unbounded(),
            (Some(limit), page) => Self::new(limit, page.unwrap_or(NonZeroUsize::MIN)),
            (None, Some(page)) => Self::new(default_page_size, page),
        })
    }

    pub fn limit(&self) -> Option<NonZeroUsize> {
        self.limit
    }

    pub fn page(&self) -> NonZeroUsize {
        self.page
    }

    /// Number of items skipped before this page starts.
    pub fn offset(&self) -> usize {
        match self.limit {
            Some(limit) => (self.page.get() - 1).saturating_mul(limit.get()),
            None => 0,
        }
    }

    /// Cut this page out of an already-filtered sequence.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        match self.limit {
            Some(limit) => items
                .into_iter()
                .skip(self.offset())
                .take(limit.get())
                .collect(),
            None => items,
        }
    }
}

fn parse_positive(raw: &str) -> Option<NonZeroUsize> {
    raw.trim().parse::<NonZeroUsize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).expect("non-zero")
    }

    #[test]
    fn no_params_returns_everything() {
        let request = PageRequest::from_params(None, None, size(20)).unwrap();
        assert_eq!(request, PageRequest::unbounded());
        assert_eq!(request.apply(vec![1, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn limit_without_page_is_first_page() {
        let request = PageRequest::from_params(Some("2"), None, size(20)).unwrap();
        assert_eq!(request.offset(), 0);
        assert_eq!(request.apply(vec![1, 2, 3]), vec![1, 2]);
    }

    #[test]
    fn page_and_limit_slice_by_offset() {
        let request = PageRequest::from_params(Some("2"), Some("2"), size(20)).unwrap();
        assert_eq!(request.offset(), 2);
        assert_eq!(request.apply(vec![1, 2, 3, 4, 5]), vec![3, 4]);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let request = PageRequest::from_params(Some("10"), Some("3"), size(20)).unwrap();
        assert!(request.apply(vec![1, 2, 3]).is_empty());
    }

    #[test]
    fn page_without_limit_uses_default_size() {
        let request = PageRequest::from_params(None, Some("2"), size(2)).unwrap();
        assert_eq!(request.limit(), Some(size(2)));
        assert_eq!(request.apply(vec![1, 2, 3, 4, 5]), vec![3, 4]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for raw in ["abc", "0", "-1", "1.5", ""] {
            assert_eq!(
                PageRequest::from_params(Some(raw), None, size(20)),
                Err(PaginationError::InvalidLimit(raw.to_string()))
            );
            assert_eq!(
                PageRequest::from_params(None, Some(raw), size(20)),
                Err(PaginationError::InvalidPage(raw.to_string()))
            );
        }
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let request = PageRequest::new(size(usize::MAX), size(usize::MAX));
        assert_eq!(request.offset(), usize::MAX);
        assert!(request.apply(vec![1]).is_empty());
    }
}
