// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{ManagerOrAbove, RequireRole},
    },
    models::reports::{DailySales, DashboardSummary, DateRange, DateRangeQuery, PaymentMethodTotal, TopProduct},
};

const DEFAULT_RANGE_DAYS: i64 = 30;
const MAX_RANGE_DAYS: i64 = 366;
const DEFAULT_TOP_LIMIT: i64 = 10;

/// Defaults to the last 30 days ending `today`.
pub fn resolve_range(query: &DateRangeQuery, today: NaiveDate) -> Result<DateRange, AppError> {
    let to = query.to.unwrap_or(today);
    let from = query.from.unwrap_or(to - Duration::days(DEFAULT_RANGE_DAYS - 1));
    if from > to {
        return Err(AppError::BadRequest("'from' must not be after 'to'.".into()));
    }
    if (to - from).num_days() >= MAX_RANGE_DAYS {
        return Err(AppError::BadRequest("Date range cannot exceed one year.".into()));
    }
    Ok(DateRange { from, to })
}

#[utoipa::path(
    get,
    path = "/api/reports/dashboard",
    tag = "Reports",
    responses((status = 200, description = "Dashboard cards", body = DashboardSummary)),
    security(("api_jwt" = []))
)]
pub async fn dashboard(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<DashboardSummary>, AppError> {
    let summary = app_state
        .report_repo
        .dashboard(user.organization_id(), Utc::now().date_naive())
        .await?;
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/api/reports/sales",
    tag = "Reports",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Sales per day", body = Vec<DailySales>),
        (status = 400, description = "Invalid date range")
    ),
    security(("api_jwt" = []))
)]
pub async fn sales(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<DailySales>>, AppError> {
    let range = resolve_range(&query, Utc::now().date_naive())?;
    let rows = app_state.report_repo.daily_sales(user.organization_id(), range).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/reports/top-products",
    tag = "Reports",
    params(DateRangeQuery),
    responses((status = 200, description = "Best sellers by quantity", body = Vec<TopProduct>)),
    security(("api_jwt" = []))
)]
pub async fn top_products(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<TopProduct>>, AppError> {
    let range = resolve_range(&query, Utc::now().date_naive())?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, 100);
    let rows = app_state
        .report_repo
        .top_products(user.organization_id(), range, limit)
        .await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/reports/payments",
    tag = "Reports",
    params(DateRangeQuery),
    responses((status = 200, description = "Collections by payment method", body = Vec<PaymentMethodTotal>)),
    security(("api_jwt" = []))
)]
pub async fn payments(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<PaymentMethodTotal>>, AppError> {
    let range = resolve_range(&query, Utc::now().date_naive())?;
    let rows = app_state.report_repo.payment_totals(user.organization_id(), range).await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_range_is_last_30_days() {
        let q = DateRangeQuery { from: None, to: None, limit: None };
        let range = resolve_range(&q, day(2026, 10, 19)).unwrap();
        assert_eq!(range.to, day(2026, 10, 19));
        assert_eq!(range.from, day(2026, 9, 20));
    }

    #[test]
    fn inverted_or_huge_ranges_are_rejected() {
        let inverted = DateRangeQuery { from: Some(day(2026, 10, 20)), to: Some(day(2026, 10, 19)), limit: None };
        assert!(resolve_range(&inverted, day(2026, 10, 19)).is_err());

        let huge = DateRangeQuery { from: Some(day(2024, 1, 1)), to: Some(day(2026, 1, 1)), limit: None };
        assert!(resolve_range(&huge, day(2026, 10, 19)).is_err());
    }

    #[test]
    fn single_day_range_is_allowed() {
        let q = DateRangeQuery { from: Some(day(2026, 10, 19)), to: Some(day(2026, 10, 19)), limit: None };
        assert!(resolve_range(&q, day(2026, 10, 19)).is_ok());
    }
}
