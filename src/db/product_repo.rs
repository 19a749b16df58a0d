// src/db/product_repo.rs

use chrono::{Duration, NaiveTime};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::{is_unique_violation, violated_constraint, AppError},
    middleware::pagination::Pagination,
    models::inventory::{
        CreateProductPayload, InventoryMovement, InventorySummary, MovementFilter, MovementType,
        MovementWithProduct, Product, ProductFilter, UpdateProductPayload,
    },
};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

// Unique violations on products carry the constraint name; turn it into a message.
fn product_conflict(err: sqlx::Error, sku: &str, barcode: Option<&str>) -> AppError {
    if is_unique_violation(&err) {
        let constraint = violated_constraint(&err).unwrap_or_default();
        if constraint.contains("barcode") {
            return AppError::Conflict(format!(
                "Barcode '{}' is already assigned to another product.",
                barcode.unwrap_or_default()
            ));
        }
        return AppError::Conflict(format!("SKU '{}' already exists.", sku));
    }
    err.into()
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Catalog
    // ---

    pub async fn list(
        &self,
        organization_id: Uuid,
        pagination: &Pagination,
        filter: &ProductFilter,
    ) -> Result<(Vec<Product>, i64), AppError> {
        fn push_filters<'a>(
            qb: &mut QueryBuilder<'a, Postgres>,
            organization_id: Uuid,
            pattern: &Option<String>,
            filter: &ProductFilter,
        ) {
            qb.push(" WHERE p.organization_id = ").push_bind(organization_id);
            qb.push(" AND p.is_active");
            if let Some(p) = pattern {
                qb.push(" AND (p.name ILIKE ").push_bind(p.clone());
                qb.push(" OR p.sku ILIKE ").push_bind(p.clone());
                qb.push(" OR p.barcode ILIKE ").push_bind(p.clone()).push(")");
            }
            if let Some(category_id) = filter.category_id {
                qb.push(" AND p.category_id = ").push_bind(category_id);
            }
            if filter.low_stock {
                qb.push(" AND p.stock_quantity <= p.low_stock_threshold");
            }
        }

        let pattern = pagination.search_pattern();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_filters(&mut count, organization_id, &pattern, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT p.* FROM products p");
        push_filters(&mut query, organization_id, &pattern, filter);
        query.push(" ORDER BY ");
        query.push(pagination.order_by(
            &[
                ("name", "p.name"),
                ("createdAt", "p.created_at"),
                ("sellingPrice", "p.selling_price"),
                ("stockQuantity", "p.stock_quantity"),
            ],
            "p.created_at",
        ));
        query.push(" LIMIT ").push_bind(pagination.limit_i64());
        query.push(" OFFSET ").push_bind(pagination.offset());

        let products = query.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok((products, total))
    }

    pub async fn find_active(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE organization_id = $1 AND id = $2 AND is_active",
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn find_by_barcode(
        &self,
        organization_id: Uuid,
        barcode: &str,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE organization_id = $1 AND barcode = $2 AND is_active",
        )
        .bind(organization_id)
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn low_stock(&self, organization_id: Uuid) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE organization_id = $1 AND is_active AND stock_quantity <= low_stock_threshold
            ORDER BY stock_quantity ASC, name ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Next value of the global barcode sequence.
    pub async fn next_barcode_sequence<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let seq: i64 = sqlx::query_scalar("SELECT nextval('product_barcode_seq')")
            .fetch_one(executor)
            .await?;
        Ok(seq)
    }

    /// Inserts the catalog row with zero stock; initial stock is a movement.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        payload: &CreateProductPayload,
        barcode: &str,
        tax_rate: Decimal,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                organization_id, category_id, name, sku, barcode, description,
                size, color, fabric, cost_price, selling_price, tax_rate, low_stock_threshold
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(payload.category_id)
        .bind(&payload.name)
        .bind(&payload.sku)
        .bind(barcode)
        .bind(&payload.description)
        .bind(&payload.size)
        .bind(&payload.color)
        .bind(&payload.fabric)
        .bind(payload.cost_price)
        .bind(payload.selling_price)
        .bind(tax_rate)
        .bind(payload.low_stock_threshold)
        .fetch_one(executor)
        .await
        .map_err(|e| product_conflict(e, &payload.sku, Some(barcode)))
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        payload: &UpdateProductPayload,
    ) -> Result<Option<Product>, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                category_id = $3, name = $4, sku = $5, barcode = $6, description = $7,
                size = $8, color = $9, fabric = $10, cost_price = $11, selling_price = $12,
                tax_rate = $13, low_stock_threshold = $14, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2 AND is_active
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .bind(payload.category_id)
        .bind(&payload.name)
        .bind(&payload.sku)
        .bind(&payload.barcode)
        .bind(&payload.description)
        .bind(&payload.size)
        .bind(&payload.color)
        .bind(&payload.fabric)
        .bind(payload.cost_price)
        .bind(payload.selling_price)
        .bind(payload.tax_rate)
        .bind(payload.low_stock_threshold)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| product_conflict(e, &payload.sku, Some(&payload.barcode)))
    }

    pub async fn soft_delete(&self, organization_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE products SET is_active = FALSE, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2 AND is_active
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Stock (always inside a transaction)
    // ---

    /// Locks the product row until the surrounding transaction ends.
    pub async fn lock_for_update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE organization_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    pub async fn set_stock<'e, E>(&self, executor: E, id: Uuid, new_stock: i32) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET stock_quantity = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(new_stock)
        .fetch_one(executor)
        .await?;
        Ok(product)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_movement<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        product_id: Uuid,
        movement_type: MovementType,
        previous_stock: i32,
        new_stock: i32,
        reason: Option<&str>,
        reference: Option<&str>,
        created_by: Option<Uuid>,
    ) -> Result<InventoryMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, InventoryMovement>(
            r#"
            INSERT INTO inventory_movements (
                organization_id, product_id, movement_type, quantity,
                previous_stock, new_stock, reason, reference, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(product_id)
        .bind(movement_type)
        .bind(new_stock - previous_stock)
        .bind(previous_stock)
        .bind(new_stock)
        .bind(reason)
        .bind(reference)
        .bind(created_by)
        .fetch_one(executor)
        .await?;
        Ok(movement)
    }

    pub async fn list_movements(
        &self,
        organization_id: Uuid,
        pagination: &Pagination,
        filter: &MovementFilter,
    ) -> Result<(Vec<MovementWithProduct>, i64), AppError> {
        fn push_filters<'a>(
            qb: &mut QueryBuilder<'a, Postgres>,
            organization_id: Uuid,
            filter: &MovementFilter,
        ) {
            qb.push(" WHERE m.organization_id = ").push_bind(organization_id);
            if let Some(product_id) = filter.product_id {
                qb.push(" AND m.product_id = ").push_bind(product_id);
            }
            if let Some(movement_type) = filter.movement_type {
                qb.push(" AND m.movement_type = ").push_bind(movement_type);
            }
            if let Some(from) = filter.from {
                qb.push(" AND m.created_at >= ").push_bind(from.and_time(NaiveTime::MIN).and_utc());
            }
            if let Some(to) = filter.to {
                // Inclusive end date.
                let end = (to + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
                qb.push(" AND m.created_at < ").push_bind(end);
            }
        }

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM inventory_movements m");
        push_filters(&mut count, organization_id, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT m.*, p.name AS product_name, p.sku AS product_sku
            FROM inventory_movements m
            JOIN products p ON p.id = m.product_id
            "#,
        );
        push_filters(&mut query, organization_id, filter);
        query.push(" ORDER BY ");
        query.push(pagination.order_by(&[("createdAt", "m.created_at")], "m.created_at"));
        query.push(" LIMIT ").push_bind(pagination.limit_i64());
        query.push(" OFFSET ").push_bind(pagination.offset());

        let movements = query
            .build_query_as::<MovementWithProduct>()
            .fetch_all(&self.pool)
            .await?;
        Ok((movements, total))
    }

    pub async fn inventory_summary(&self, organization_id: Uuid) -> Result<InventorySummary, AppError> {
        let summary = sqlx::query_as::<_, InventorySummary>(
            r#"
            SELECT
                COUNT(*)                                                         AS product_count,
                COALESCE(SUM(stock_quantity), 0)::BIGINT                         AS total_units,
                COALESCE(SUM(stock_quantity * cost_price), 0)                    AS stock_value_at_cost,
                COALESCE(SUM(stock_quantity * selling_price), 0)                 AS stock_value_at_price,
                COUNT(*) FILTER (WHERE stock_quantity <= low_stock_threshold)    AS low_stock_count,
                COUNT(*) FILTER (WHERE stock_quantity = 0)                       AS out_of_stock_count
            FROM products
            WHERE organization_id = $1 AND is_active
            "#,
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }
}
