//! Offset-based pagination of listing queries.

use serde::{Deserialize, Serialize};

/// Maximum number of items per page.
pub const MAX_LIMIT: i64 = 1000;

/// Offset and limit of a listing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPagination {
    /// Maximum number of records to return.
    pub limit: i64,
    /// Number of records to skip.
    pub offset: i64,
    /// Whether to run the extra count query.
    #[serde(default)]
    pub include_count: bool,
}

impl OffsetPagination {
    /// Creates pagination with `limit` clamped to `1..=MAX_LIMIT` and a
    /// non-negative `offset`.
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset: offset.max(0),
            include_count: false,
        }
    }

    /// Creates pagination from a 1-based page number and a page size.
    pub fn from_page(page: i64, page_size: i64) -> Self {
        let page_size = page_size.clamp(1, MAX_LIMIT);
        Self {
            limit: page_size,
            offset: (page.max(1) - 1).saturating_mul(page_size),
            include_count: false,
        }
    }

    /// Requests the total count alongside the page.
    pub fn with_count(mut self) -> Self {
        self.include_count = true;
        self
    }
}

impl Default for OffsetPagination {
    fn default() -> Self {
        Self::new(50, 0)
    }
}

/// One page of a listing query.
#[derive(Debug, Clone, Serialize)]
pub struct OffsetPage<T> {
    /// Items of this page.
    pub items: Vec<T>,
    /// Number of matching items across all pages, if requested.
    pub total: Option<i64>,
}

impl<T> OffsetPage<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, total: Option<i64>) -> Self {
        Self { items, total }
    }

    /// Maps the items to a different type.
    pub fn map<U, F>(self, f: F) -> OffsetPage<U>
    where
        F: FnMut(T) -> U,
    {
        OffsetPage {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }

    /// Returns whether more pages follow, if the total is known.
    pub fn has_more(&self, pagination: &OffsetPagination) -> Option<bool> {
        self.total
            .map(|total| pagination.offset + (self.items.len() as i64) < total)
    }
}
