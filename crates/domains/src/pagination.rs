//! Page-number pagination over the date-ordered advert listing.

use serde::Serialize;

use crate::error::AppError;

/// A validated page request resolved against the collection size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    page_size: u64,
    total: u64,
    total_pages: u64,
}

impl Pagination {
    /// Checks `page` against `ceil(total / page_size)`.
    ///
    /// An empty collection still has a (blank) first page.
    pub fn resolve(page: i64, page_size: u32, total: u64) -> Result<Self, AppError> {
        if page < 1 {
            return Err(AppError::InvalidPage(page));
        }
        if page_size == 0 {
            return Err(AppError::InvalidRequest("page size must be positive".into()));
        }
        let page = page.unsigned_abs();
        let page_size = u64::from(page_size);
        let total_pages = total.div_ceil(page_size);

        let exists = if total == 0 { page == 1 } else { page <= total_pages };
        if !exists {
            return Err(AppError::not_found("Page", page));
        }

        Ok(Self {
            page,
            page_size,
            total,
            total_pages,
        })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Index of the first row of this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

/// One page of results plus what a pager needs to render its links.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: &Pagination) -> Self {
        Self {
            items,
            page: pagination.page(),
            total_pages: pagination.total_pages(),
            total: pagination.total(),
        }
    }
}
