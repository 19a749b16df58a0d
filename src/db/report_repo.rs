// src/db/report_repo.rs

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::reports::{DailySales, DashboardSummary, DateRange, PaymentMethodTotal, TopProduct},
};

#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

fn start_of(day: NaiveDate) -> chrono::DateTime<chrono::Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

// Half-open [from, to + 1 day) so the `to` day is included.
fn bounds(range: DateRange) -> (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) {
    (start_of(range.from), start_of(range.to + Duration::days(1)))
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn dashboard(&self, organization_id: Uuid, today: NaiveDate) -> Result<DashboardSummary, AppError> {
        let month_start = today.with_day(1).unwrap_or(today);

        let (sales_today, bills_today): (Decimal, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_amount), 0), COUNT(*)
            FROM bills
            WHERE organization_id = $1 AND status <> 'CANCELLED'
              AND created_at >= $2 AND created_at < $3
            "#,
        )
        .bind(organization_id)
        .bind(start_of(today))
        .bind(start_of(today + Duration::days(1)))
        .fetch_one(&self.pool)
        .await?;

        let sales_this_month: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_amount), 0)
            FROM bills
            WHERE organization_id = $1 AND status <> 'CANCELLED' AND created_at >= $2
            "#,
        )
        .bind(organization_id)
        .bind(start_of(month_start))
        .fetch_one(&self.pool)
        .await?;

        let outstanding_receivables: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_amount - paid_amount), 0)
            FROM bills
            WHERE organization_id = $1 AND status IN ('PENDING', 'PARTIAL')
            "#,
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        let customer_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customers WHERE organization_id = $1 AND is_active = TRUE",
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        let low_stock_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM products
            WHERE organization_id = $1 AND is_active = TRUE AND stock_quantity <= low_stock_threshold
            "#,
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardSummary {
            sales_today,
            bills_today,
            sales_this_month,
            outstanding_receivables,
            customer_count,
            low_stock_count,
        })
    }

    /// One row per day in the range, zero-filled.
    pub async fn daily_sales(&self, organization_id: Uuid, range: DateRange) -> Result<Vec<DailySales>, AppError> {
        let (from, to) = bounds(range);
        let rows = sqlx::query_as::<_, DailySales>(
            r#"
            WITH days AS (
                SELECT generate_series($2::DATE, $3::DATE, INTERVAL '1 day')::DATE AS day
            ),
            billed AS (
                SELECT (created_at AT TIME ZONE 'UTC')::DATE AS day,
                       COUNT(*) AS bill_count,
                       SUM(total_amount) AS revenue
                FROM bills
                WHERE organization_id = $1 AND status <> 'CANCELLED'
                  AND created_at >= $4 AND created_at < $5
                GROUP BY 1
            ),
            paid AS (
                SELECT (p.paid_at AT TIME ZONE 'UTC')::DATE AS day, SUM(p.amount) AS collected
                FROM payments p
                JOIN bills b ON b.id = p.bill_id
                WHERE p.organization_id = $1 AND b.status <> 'CANCELLED'
                  AND p.paid_at >= $4 AND p.paid_at < $5
                GROUP BY 1
            )
            SELECT d.day,
                   COALESCE(billed.bill_count, 0) AS bill_count,
                   COALESCE(billed.revenue, 0) AS revenue,
                   COALESCE(paid.collected, 0) AS collected
            FROM days d
            LEFT JOIN billed ON billed.day = d.day
            LEFT JOIN paid ON paid.day = d.day
            ORDER BY d.day ASC
            "#,
        )
        .bind(organization_id)
        .bind(range.from)
        .bind(range.to)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn top_products(
        &self,
        organization_id: Uuid,
        range: DateRange,
        limit: i64,
    ) -> Result<Vec<TopProduct>, AppError> {
        let (from, to) = bounds(range);
        let rows = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT bi.product_id,
                   MAX(bi.product_name) AS product_name,
                   SUM(bi.quantity)::BIGINT AS quantity_sold,
                   SUM(bi.line_total) AS revenue
            FROM bill_items bi
            JOIN bills b ON b.id = bi.bill_id
            WHERE b.organization_id = $1 AND b.status <> 'CANCELLED'
              AND b.created_at >= $2 AND b.created_at < $3
            GROUP BY bi.product_id
            ORDER BY quantity_sold DESC, revenue DESC
            LIMIT $4
            "#,
        )
        .bind(organization_id)
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn payment_totals(
        &self,
        organization_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<PaymentMethodTotal>, AppError> {
        let (from, to) = bounds(range);
        let rows = sqlx::query_as::<_, PaymentMethodTotal>(
            r#"
            SELECT p.method, COUNT(*) AS payment_count, SUM(p.amount) AS total
            FROM payments p
            JOIN bills b ON b.id = p.bill_id
            WHERE p.organization_id = $1 AND b.status <> 'CANCELLED'
              AND p.paid_at >= $2 AND p.paid_at < $3
            GROUP BY p.method
            ORDER BY total DESC
            "#,
        )
        .bind(organization_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bounds_include_last_day() {
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        };
        let (from, to) = bounds(range);
        assert_eq!(from.to_rfc3339(), "2026-10-01T00:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2026-10-20T00:00:00+00:00");
    }
}
