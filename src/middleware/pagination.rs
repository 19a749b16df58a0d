// src/middleware/pagination.rs

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::common::{error::AppError, sanitize::clean_text};

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number, starting at 1.
    pub page: Option<u32>,
    /// Page size, 1 to 100.
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Normalized pagination, parsed from the query string.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
}

impl From<PaginationParams> for Pagination {
    fn from(params: PaginationParams) -> Self {
        let search = params
            .search
            .map(|s| clean_text(&s))
            .filter(|s| !s.is_empty());
        let sort_order = match params.sort_order.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        Self {
            page: params.page.unwrap_or(1).max(1),
            limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            search,
            sort_by: params.sort_by,
            sort_order,
        }
    }
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit_i64(&self) -> i64 {
        i64::from(self.limit)
    }

    /// `%term%` for ILIKE filters.
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|s| {
            let escaped = s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            format!("%{}%", escaped)
        })
    }

    /// Resolves `sort_by` against a whitelist of (api name, column) pairs.
    /// Unknown values fall back to `default`, so user input never reaches SQL.
    pub fn order_by(&self, allowed: &[(&str, &'static str)], default: &'static str) -> String {
        let column = self
            .sort_by
            .as_deref()
            .and_then(|requested| {
                allowed
                    .iter()
                    .find(|(name, _)| *name == requested)
                    .map(|(_, column)| *column)
            })
            .unwrap_or(default);
        format!("{} {}", column, self.sort_order.as_sql())
    }
}

impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PaginationParams>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(params.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn defaults_and_clamping() {
        let p: Pagination = PaginationParams::default().into();
        assert_eq!((p.page, p.limit, p.offset()), (1, DEFAULT_LIMIT, 0));
        assert_eq!(p.sort_order, SortOrder::Desc);

        let p: Pagination = PaginationParams {
            page: Some(0),
            limit: Some(1000),
            ..Default::default()
        }
        .into();
        assert_eq!((p.page, p.limit), (1, MAX_LIMIT));

        let p: Pagination = PaginationParams {
            page: Some(3),
            limit: Some(25),
            ..Default::default()
        }
        .into();
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn order_by_uses_whitelist_only() {
        let allowed = [("name", "p.name"), ("createdAt", "p.created_at")];
        let p: Pagination = PaginationParams {
            sort_by: Some("name".into()),
            sort_order: Some("ASC".into()),
            ..Default::default()
        }
        .into();
        assert_eq!(p.order_by(&allowed, "p.created_at"), "p.name ASC");

        let p: Pagination = PaginationParams {
            sort_by: Some("name; DROP TABLE products".into()),
            ..Default::default()
        }
        .into();
        assert_eq!(p.order_by(&allowed, "p.created_at"), "p.created_at DESC");
    }

    #[test]
    fn search_is_escaped_for_like() {
        let p: Pagination = PaginationParams {
            search: Some(" 50%_off ".into()),
            ..Default::default()
        }
        .into();
        assert_eq!(p.search_pattern().as_deref(), Some("%50\\%\\_off%"));

        let p: Pagination = PaginationParams {
            search: Some("   ".into()),
            ..Default::default()
        }
        .into();
        assert!(p.search_pattern().is_none());
    }

    #[tokio::test]
    async fn parses_from_query_string() {
        let (mut parts, _) = Request::builder()
            .uri("/api/products?page=2&limit=10&search=shirt&sortOrder=asc")
            .body(())
            .unwrap()
            .into_parts();
        let p = Pagination::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!((p.page, p.limit), (2, 10));
        assert_eq!(p.search.as_deref(), Some("shirt"));
        assert_eq!(p.sort_order, SortOrder::Asc);

        let (mut parts, _) = Request::builder()
            .uri("/api/products?page=abc")
            .body(())
            .unwrap()
            .into_parts();
        assert!(Pagination::from_request_parts(&mut parts, &()).await.is_err());
    }
}
