// src/db/customer_repo.rs

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::{is_unique_violation, AppError},
    middleware::pagination::Pagination,
    models::crm::{Customer, CustomerPayload, Measurement, MeasurementPayload},
};

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

fn phone_conflict(err: sqlx::Error, phone: Option<&str>) -> AppError {
    if is_unique_violation(&err) {
        return AppError::Conflict(format!(
            "A customer with phone '{}' already exists.",
            phone.unwrap_or_default()
        ));
    }
    err.into()
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Customers
    // ---

    pub async fn list(
        &self,
        organization_id: Uuid,
        pagination: &Pagination,
    ) -> Result<(Vec<Customer>, i64), AppError> {
        fn push_filters<'a>(
            qb: &mut QueryBuilder<'a, Postgres>,
            organization_id: Uuid,
            pattern: &Option<String>,
        ) {
            qb.push(" WHERE organization_id = ").push_bind(organization_id);
            qb.push(" AND is_active");
            if let Some(p) = pattern {
                qb.push(" AND (name ILIKE ").push_bind(p.clone());
                qb.push(" OR phone ILIKE ").push_bind(p.clone());
                qb.push(" OR email ILIKE ").push_bind(p.clone()).push(")");
            }
        }

        let pattern = pagination.search_pattern();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers");
        push_filters(&mut count, organization_id, &pattern);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM customers");
        push_filters(&mut query, organization_id, &pattern);
        query.push(" ORDER BY ");
        query.push(pagination.order_by(&[("name", "name"), ("createdAt", "created_at")], "created_at"));
        query.push(" LIMIT ").push_bind(pagination.limit_i64());
        query.push(" OFFSET ").push_bind(pagination.offset());

        let customers = query.build_query_as::<Customer>().fetch_all(&self.pool).await?;
        Ok((customers, total))
    }

    pub async fn find_active(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE organization_id = $1 AND id = $2 AND is_active",
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    // Bills keep pointing at deactivated customers, so documents need this one.
    pub async fn find_any(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE organization_id = $1 AND id = $2",
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    pub async fn create(&self, organization_id: Uuid, payload: &CustomerPayload) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (organization_id, name, phone, email, address, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(&payload.name)
        .bind(&payload.phone)
        .bind(&payload.email)
        .bind(&payload.address)
        .bind(&payload.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| phone_conflict(e, payload.phone.as_deref()))
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        payload: &CustomerPayload,
    ) -> Result<Option<Customer>, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name = $3, phone = $4, email = $5, address = $6, notes = $7, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2 AND is_active
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .bind(&payload.name)
        .bind(&payload.phone)
        .bind(&payload.email)
        .bind(&payload.address)
        .bind(&payload.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| phone_conflict(e, payload.phone.as_deref()))
    }

    pub async fn soft_delete(&self, organization_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET is_active = FALSE, updated_at = NOW()
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
    // Measurements
    // ---

    pub async fn list_measurements(
        &self,
        organization_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Vec<Measurement>, AppError> {
        let measurements = sqlx::query_as::<_, Measurement>(
            r#"
            SELECT * FROM measurements
            WHERE organization_id = $1 AND customer_id = $2
            ORDER BY garment_type ASC, updated_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(measurements)
    }

    pub async fn create_measurement(
        &self,
        organization_id: Uuid,
        customer_id: Uuid,
        payload: &MeasurementPayload,
    ) -> Result<Measurement, AppError> {
        let values = serde_json::to_value(&payload.values).map_err(anyhow::Error::from)?;
        let measurement = sqlx::query_as::<_, Measurement>(
            r#"
            INSERT INTO measurements (organization_id, customer_id, garment_type, measurement_values, unit, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(customer_id)
        .bind(&payload.garment_type)
        .bind(values)
        .bind(payload.unit)
        .bind(&payload.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(measurement)
    }

    pub async fn update_measurement(
        &self,
        organization_id: Uuid,
        customer_id: Uuid,
        id: Uuid,
        payload: &MeasurementPayload,
    ) -> Result<Option<Measurement>, AppError> {
        let values = serde_json::to_value(&payload.values).map_err(anyhow::Error::from)?;
        let measurement = sqlx::query_as::<_, Measurement>(
            r#"
            UPDATE measurements SET
                garment_type = $4, measurement_values = $5, unit = $6, notes = $7, updated_at = NOW()
            WHERE organization_id = $1 AND customer_id = $2 AND id = $3
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(customer_id)
        .bind(id)
        .bind(&payload.garment_type)
        .bind(values)
        .bind(payload.unit)
        .bind(&payload.notes)
        .fetch_optional(&self.pool)
        .await?;
        Ok(measurement)
    }

    pub async fn delete_measurement(
        &self,
        organization_id: Uuid,
        customer_id: Uuid,
        id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM measurements WHERE organization_id = $1 AND customer_id = $2 AND id = $3",
        )
        .bind(organization_id)
        .bind(customer_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
