// src/common/pagination.rs

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub limit: u32,
    #[schema(example = 57)]
    pub total: i64,
    #[schema(example = 3)]
    pub total_pages: i64,
}

// Envelope for every paginated list endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: u32, limit: u32, total: i64) -> Self {
        let limit_i = i64::from(limit.max(1));
        let total_pages = (total + limit_i - 1) / limit_i;
        Self {
            data,
            pagination: PageMeta { page, limit, total, total_pages },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let p = Paginated::new(vec![1, 2, 3], 1, 20, 41);
        assert_eq!(p.pagination.total_pages, 3);

        let p: Paginated<i32> = Paginated::new(vec![], 1, 20, 0);
        assert_eq!(p.pagination.total_pages, 0);

        let p: Paginated<i32> = Paginated::new(vec![], 2, 20, 40);
        assert_eq!(p.pagination.total_pages, 2);
    }
}
