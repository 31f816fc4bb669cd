use serde::{Deserialize, Serialize};

/// Page/limit query params shared by the paginated listings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl PageQuery {
    /// Clamped page (>= 1) and limit (1..=100).
    pub fn clamped(&self) -> (i64, i64) {
        (self.page.max(1), self.limit.clamp(1, 100))
    }

    pub fn offset(&self) -> i64 {
        let (page, limit) = self.clamped();
        (page - 1) * limit
    }
}

/// Standard envelope for paginated listings.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, query: &PageQuery) -> Self {
        let (page, limit) = query.clamped();
        Self {
            items,
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

/// Query params for the full application listing.
#[derive(Debug, Default, Deserialize)]
pub struct ApplicationQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: StatusCounts,
    pub by_faculty: Vec<GroupCount>,
    pub by_role: Vec<GroupCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_and_computes_offset() {
        let q = PageQuery { page: 0, limit: 0 };
        assert_eq!(q.clamped(), (1, 1));
        assert_eq!(q.offset(), 0);

        let q = PageQuery {
            page: 3,
            limit: 500,
        };
        assert_eq!(q.clamped(), (3, 100));
        assert_eq!(q.offset(), 200);
    }

    #[test]
    fn paginated_computes_total_pages() {
        let q = PageQuery { page: 1, limit: 10 };
        assert_eq!(Paginated::new(Vec::<u8>::new(), 0, &q).total_pages, 0);
        assert_eq!(Paginated::new(Vec::<u8>::new(), 1, &q).total_pages, 1);
        assert_eq!(Paginated::new(Vec::<u8>::new(), 10, &q).total_pages, 1);
        assert_eq!(Paginated::new(Vec::<u8>::new(), 11, &q).total_pages, 2);
    }

    #[test]
    fn page_query_defaults() {
        let q: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 10);
    }
}
