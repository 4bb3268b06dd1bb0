//! Offset pagination.

use serde::Serialize;

/// Errors that can occur when building a [`PageRequest`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PageRequestError {
    /// Page numbers start at 1.
    #[error("page must be at least 1")]
    PageOutOfRange,
    /// A page must hold at least one row.
    #[error("limit must be at least 1")]
    LimitOutOfRange,
}

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Page used when the client does not ask for one.
    pub const DEFAULT_PAGE: u32 = 1;
    /// Page size used when the client does not ask for one.
    pub const DEFAULT_LIMIT: u32 = 12;
    /// Largest page size served; larger requests are clamped.
    pub const MAX_LIMIT: u32 = 100;

    /// Create a page request.
    ///
    /// `limit` values above [`Self::MAX_LIMIT`] are clamped.
    ///
    /// # Errors
    ///
    /// Returns an error if `page` or `limit` is zero.
    pub fn new(page: u32, limit: u32) -> Result<Self, PageRequestError> {
        if page == 0 {
            return Err(PageRequestError::PageOutOfRange);
        }
        if limit == 0 {
            return Err(PageRequestError::LimitOutOfRange);
        }

        Ok(Self {
            page,
            limit: limit.min(Self::MAX_LIMIT),
        })
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Rows to skip: `(page - 1) * limit`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Page metadata returned alongside a page of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// The page that was served.
    pub page: u32,
    /// `ceil(total / limit)`; zero when nothing matched.
    pub total_pages: i64,
    /// Rows matching the filters, ignoring pagination.
    pub total_products: i64,
}

impl PageInfo {
    /// Derive page metadata from a request and the unpaginated row count.
    #[must_use]
    pub fn new(request: PageRequest, total: i64) -> Self {
        let limit = i64::from(request.limit());
        let total = total.max(0);

        Self {
            page: request.page(),
            total_pages: (total + limit - 1) / limit,
            total_products: total,
        }
    }

    /// Metadata for a request that cannot match any row.
    #[must_use]
    pub fn empty(request: PageRequest) -> Self {
        Self::new(request, 0)
    }
}
