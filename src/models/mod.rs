pub mod log_entry;
pub mod notification;
pub mod profile;
pub mod report;
pub mod user;

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        Self {
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit.max(1),
        }
    }
}

/// Resolve optional `page`/`limit` query params to a (page, limit, offset)
/// window. Defaults: page 1, limit 50, limit capped at 100.
pub fn page_window(page: Option<u32>, limit: Option<u32>) -> (i64, i64, i64) {
    let page = i64::from(page.unwrap_or(1).max(1));
    let limit = i64::from(limit.unwrap_or(50).clamp(1, 100));
    (page, limit, (page - 1) * limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_defaults() {
        assert_eq!(page_window(None, None), (1, 50, 0));
        assert_eq!(page_window(Some(3), Some(20)), (3, 20, 40));
        assert_eq!(page_window(Some(1), Some(500)), (1, 100, 0));
    }

    #[test]
    fn pagination_rounds_up() {
        let p = Pagination::new(101, 1, 50);
        assert_eq!(p.total_pages, 3);
    }
}
