// src/db/settings_repo.rs

use serde_json::Value;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::settings::{BusinessSettings, Setting, UpdateBusinessSettingsRequest},
};

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Business profile
    // ---

    pub async fn find_business<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
    ) -> Result<Option<BusinessSettings>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, BusinessSettings>(
            "SELECT * FROM business_settings WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(settings)
    }

    /// Returns the stored profile, or defaults named after the organization.
    pub async fn get_business(&self, organization_id: Uuid) -> Result<BusinessSettings, AppError> {
        if let Some(settings) = self.find_business(&self.pool, organization_id).await? {
            return Ok(settings);
        }

        let shop_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM organizations WHERE id = $1")
                .bind(organization_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(BusinessSettings::defaults(
            organization_id,
            shop_name.as_deref().unwrap_or("My Shop"),
        ))
    }

    pub async fn insert_defaults<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        shop_name: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let defaults = BusinessSettings::defaults(organization_id, shop_name);
        sqlx::query(
            r#"
            INSERT INTO business_settings (organization_id, shop_name, currency, default_tax_rate, invoice_prefix)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (organization_id) DO NOTHING
            "#,
        )
        .bind(organization_id)
        .bind(&defaults.shop_name)
        .bind(&defaults.currency)
        .bind(defaults.default_tax_rate)
        .bind(&defaults.invoice_prefix)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn upsert_business(
        &self,
        organization_id: Uuid,
        req: &UpdateBusinessSettingsRequest,
    ) -> Result<BusinessSettings, AppError> {
        let settings = sqlx::query_as::<_, BusinessSettings>(
            r#"
            INSERT INTO business_settings (
                organization_id, shop_name, address, phone, email, tax_id, currency,
                default_tax_rate, invoice_prefix, invoice_footer, upi_id, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            ON CONFLICT (organization_id) DO UPDATE SET
                shop_name = EXCLUDED.shop_name,
                address = EXCLUDED.address,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                tax_id = EXCLUDED.tax_id,
                currency = EXCLUDED.currency,
                default_tax_rate = EXCLUDED.default_tax_rate,
                invoice_prefix = EXCLUDED.invoice_prefix,
                invoice_footer = EXCLUDED.invoice_footer,
                upi_id = EXCLUDED.upi_id,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(&req.shop_name)
        .bind(&req.address)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.tax_id)
        .bind(&req.currency)
        .bind(req.default_tax_rate)
        .bind(&req.invoice_prefix)
        .bind(&req.invoice_footer)
        .bind(&req.upi_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(settings)
    }

    // ---
    // Key/value settings
    // ---

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<Setting>, AppError> {
        let settings = sqlx::query_as::<_, Setting>(
            "SELECT key, value, updated_at FROM settings WHERE organization_id = $1 ORDER BY key ASC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(settings)
    }

    pub async fn get(&self, organization_id: Uuid, key: &str) -> Result<Option<Setting>, AppError> {
        let setting = sqlx::query_as::<_, Setting>(
            "SELECT key, value, updated_at FROM settings WHERE organization_id = $1 AND key = $2",
        )
        .bind(organization_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(setting)
    }

    pub async fn upsert(&self, organization_id: Uuid, key: &str, value: &Value) -> Result<Setting, AppError> {
        let setting = sqlx::query_as::<_, Setting>(
            r#"
            INSERT INTO settings (organization_id, key, value, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (organization_id, key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING key, value, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;
        Ok(setting)
    }

    pub async fn delete(&self, organization_id: Uuid, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM settings WHERE organization_id = $1 AND key = $2")
            .bind(organization_id)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
