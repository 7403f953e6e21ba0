//! Pagination helpers for list endpoints

/// Default page size when the client does not ask for one
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Hard ceiling on page size
pub const MAX_PER_PAGE: i64 = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page after clamping
    pub per_page: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Total number of rows in the result set
    pub total: i64,
    /// Offset for SQL LIMIT/OFFSET query
    #[serde(skip_serializing)]
    pub offset: i64,
}

/// Calculate pagination metadata from total results and the requested window
///
/// Clamps `per_page` to [1, MAX_PER_PAGE] and `page` to [1, total_pages].
pub fn calculate_pagination(total: i64, requested_page: i64, requested_per_page: i64) -> Pagination {
    let per_page = requested_per_page.max(1).min(MAX_PER_PAGE);
    let total_pages = (total + per_page - 1) / per_page;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * per_page;

    Pagination {
        page,
        per_page,
        total_pages,
        total,
        offset,
    }
}
