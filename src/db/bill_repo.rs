// src/db/bill_repo.rs

use chrono::{Duration, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    middleware::pagination::Pagination,
    models::billing::{
        Bill, BillFilter, BillItem, BillStatus, BillSummary, BillTotals, Payment, PaymentPayload,
        PricedLine,
    },
};

#[derive(Clone)]
pub struct BillRepository {
    pool: PgPool,
}

pub struct NewBill<'a> {
    pub organization_id: Uuid,
    pub bill_number: &'a str,
    pub customer_id: Option<Uuid>,
    pub totals: &'a BillTotals,
    pub notes: Option<&'a str>,
    pub due_date: Option<NaiveDate>,
    pub created_by: Uuid,
}

impl BillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Writes (transactional)
    // ---

    /// Per-organization, per-day counter. The upsert serializes concurrent bills.
    pub async fn next_bill_sequence<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        day: NaiveDate,
    ) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let seq: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO bill_counters (organization_id, day, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (organization_id, day)
            DO UPDATE SET last_value = bill_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(organization_id)
        .bind(day)
        .fetch_one(executor)
        .await?;
        Ok(seq)
    }

    pub async fn insert_bill<'e, E>(&self, executor: E, bill: NewBill<'_>) -> Result<Bill, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Bill>(
            r#"
            INSERT INTO bills (
                organization_id, bill_number, customer_id, status, subtotal, discount_total,
                tax_total, total_amount, paid_amount, notes, due_date, created_by
            )
            VALUES ($1, $2, $3, 'PENDING', $4, $5, $6, $7, 0, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(bill.organization_id)
        .bind(bill.bill_number)
        .bind(bill.customer_id)
        .bind(bill.totals.subtotal)
        .bind(bill.totals.discount_total)
        .bind(bill.totals.tax_total)
        .bind(bill.totals.total_amount)
        .bind(bill.notes)
        .bind(bill.due_date)
        .bind(bill.created_by)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn insert_item<'e, E>(&self, executor: E, bill_id: Uuid, line: &PricedLine) -> Result<BillItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, BillItem>(
            r#"
            INSERT INTO bill_items (
                bill_id, product_id, product_name, quantity, unit_price,
                discount, tax_rate, tax_amount, line_total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(bill_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.discount)
        .bind(line.tax_rate)
        .bind(line.tax_amount)
        .bind(line.line_total)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    pub async fn insert_payment<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        bill_id: Uuid,
        payment: &PaymentPayload,
        received_by: Uuid,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (bill_id, organization_id, amount, method, reference, received_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(bill_id)
        .bind(organization_id)
        .bind(payment.amount)
        .bind(payment.method)
        .bind(&payment.reference)
        .bind(received_by)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn lock_bill<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Bill>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bill = sqlx::query_as::<_, Bill>(
            "SELECT * FROM bills WHERE organization_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(bill)
    }

    pub async fn update_payment_state<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        paid_amount: Decimal,
        status: BillStatus,
    ) -> Result<Bill, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bill = sqlx::query_as::<_, Bill>(
            r#"
            UPDATE bills SET paid_amount = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(paid_amount)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(bill)
    }

    pub async fn mark_cancelled<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        reason: Option<&str>,
    ) -> Result<Bill, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bill = sqlx::query_as::<_, Bill>(
            r#"
            UPDATE bills SET
                status = 'CANCELLED',
                cancelled_at = NOW(),
                notes = CASE
                    WHEN $2::TEXT IS NULL THEN notes
                    ELSE CONCAT_WS(E'\n', notes, 'Cancelled: ' || $2::TEXT)
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_one(executor)
        .await?;
        Ok(bill)
    }

    pub async fn list_items<'e, E>(&self, executor: E, bill_id: Uuid) -> Result<Vec<BillItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, BillItem>(
            "SELECT * FROM bill_items WHERE bill_id = $1 ORDER BY product_name ASC",
        )
        .bind(bill_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    // ---
    // Reads
    // ---

    pub async fn find_summary(&self, organization_id: Uuid, id: Uuid) -> Result<Option<BillSummary>, AppError> {
        let bill = sqlx::query_as::<_, BillSummary>(
            r#"
            SELECT b.*, c.name AS customer_name
            FROM bills b
            LEFT JOIN customers c ON c.id = b.customer_id
            WHERE b.organization_id = $1 AND b.id = $2
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(bill)
    }

    pub async fn list_payments(&self, bill_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE bill_id = $1 ORDER BY paid_at ASC",
        )
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
        pagination: &Pagination,
        filter: &BillFilter,
    ) -> Result<(Vec<BillSummary>, i64), AppError> {
        fn push_filters<'a>(
            qb: &mut QueryBuilder<'a, Postgres>,
            organization_id: Uuid,
            pattern: &Option<String>,
            filter: &BillFilter,
        ) {
            qb.push(" WHERE b.organization_id = ").push_bind(organization_id);
            if let Some(status) = filter.status {
                qb.push(" AND b.status = ").push_bind(status);
            }
            if let Some(customer_id) = filter.customer_id {
                qb.push(" AND b.customer_id = ").push_bind(customer_id);
            }
            if let Some(from) = filter.from {
                qb.push(" AND b.created_at >= ").push_bind(from.and_time(NaiveTime::MIN).and_utc());
            }
            if let Some(to) = filter.to {
                let end = (to + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
                qb.push(" AND b.created_at < ").push_bind(end);
            }
            if let Some(p) = pattern {
                qb.push(" AND (b.bill_number ILIKE ").push_bind(p.clone());
                qb.push(" OR c.name ILIKE ").push_bind(p.clone()).push(")");
            }
        }

        let pattern = pagination.search_pattern();
        let from_clause = " FROM bills b LEFT JOIN customers c ON c.id = b.customer_id";

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        count.push(from_clause);
        push_filters(&mut count, organization_id, &pattern, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT b.*, c.name AS customer_name");
        query.push(from_clause);
        push_filters(&mut query, organization_id, &pattern, filter);
        query.push(" ORDER BY ");
        query.push(pagination.order_by(
            &[
                ("createdAt", "b.created_at"),
                ("totalAmount", "b.total_amount"),
                ("billNumber", "b.bill_number"),
            ],
            "b.created_at",
        ));
        query.push(" LIMIT ").push_bind(pagination.limit_i64());
        query.push(" OFFSET ").push_bind(pagination.offset());

        let bills = query.build_query_as::<BillSummary>().fetch_all(&self.pool).await?;
        Ok((bills, total))
    }

    pub async fn list_for_customer(&self, organization_id: Uuid, customer_id: Uuid) -> Result<Vec<Bill>, AppError> {
        let bills = sqlx::query_as::<_, Bill>(
            r#"
            SELECT * FROM bills
            WHERE organization_id = $1 AND customer_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bills)
    }
}
