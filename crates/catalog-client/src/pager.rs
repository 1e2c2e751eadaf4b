//! Page/query view over a paginated item listing.

use crate::client::{DEFAULT_PAGE_SIZE, ItemsRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemsPager {
    page: u32,
    page_size: u32,
    query: String,
    total: u64,
}

impl Default for ItemsPager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ItemsPager {
    /// A pager on page 1 with an empty query. A zero page size is treated as one.
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            query: String::new(),
            total: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Always at least one, even for an empty listing.
    pub fn total_pages(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.page_size)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Record the filtered total reported by the last fetch.
    pub fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    /// Change the search text; any change goes back to the first page.
    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if query != self.query {
            self.query = query;
            self.page = 1;
        }
    }

    /// Jump to a page, clamped to `1..=total_pages`.
    pub fn go_to(&mut self, page: u32) {
        self.page = page.clamp(1, self.total_pages());
    }

    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn previous(&mut self) -> bool {
        if self.has_previous() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// The fetch that shows the current view.
    pub fn request(&self) -> ItemsRequest {
        ItemsRequest {
            page: self.page,
            limit: self.page_size,
            q: self.query.clone(),
        }
    }
}
