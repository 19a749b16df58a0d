// src/db/category_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::{is_unique_violation, AppError},
    models::inventory::{Category, CategoryPayload},
};

#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_active(&self, organization_id: Uuid) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE organization_id = $1 AND is_active ORDER BY name ASC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn find_active(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE organization_id = $1 AND id = $2 AND is_active",
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        payload: &CategoryPayload,
    ) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (organization_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(&payload.name)
        .bind(&payload.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::Conflict(format!("Category '{}' already exists.", payload.name));
            }
            e.into()
        })
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        payload: &CategoryPayload,
    ) -> Result<Option<Category>, AppError> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET name = $3, description = $4, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2 AND is_active
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .bind(&payload.name)
        .bind(&payload.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::Conflict(format!("Category '{}' already exists.", payload.name));
            }
            e.into()
        })
    }

    /// Soft delete. Refused while active products still point at the category.
    pub async fn soft_delete(&self, organization_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let in_use: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE organization_id = $1 AND category_id = $2 AND is_active",
        )
        .bind(organization_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if in_use > 0 {
            return Err(AppError::Conflict(format!(
                "Category is used by {} active product(s).",
                in_use
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE categories SET is_active = FALSE, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2 AND is_active
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category"));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{product_payload, seeded_state};
    use rust_decimal::Decimal;

    fn category(name: &str) -> CategoryPayload {
        CategoryPayload {
            name: name.to_string(),
            description: None,
        }
    }

    #[sqlx::test]
    async fn category_in_use_cannot_be_deleted(pool: PgPool) {
        let (state, admin) = seeded_state(pool).await;
        let org = admin.organization_id;
        let repo = &state.category_repo;

        let suits = repo.create(org, &category("Suits")).await.unwrap();
        let mut payload = product_payload("SUIT-01", Decimal::new(9000, 0), 0);
        payload.category_id = Some(suits.id);
        let product = state
            .inventory_service
            .create_product(org, admin.id, &payload)
            .await
            .unwrap();

        let err = repo.soft_delete(org, suits.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Once the product is gone the category can go too.
        state.product_repo.soft_delete(org, product.id).await.unwrap();
        repo.soft_delete(org, suits.id).await.unwrap();
        assert!(repo.find_active(org, suits.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn soft_deleted_categories_free_their_name(pool: PgPool) {
        let (state, admin) = seeded_state(pool).await;
        let org = admin.organization_id;
        let repo = &state.category_repo;

        let shirts = repo.create(org, &category("Shirts")).await.unwrap();
        repo.create(org, &category("Blazers")).await.unwrap();

        let duplicate = repo.create(org, &category("shirts")).await.unwrap_err();
        assert!(matches!(duplicate, AppError::Conflict(_)));

        repo.soft_delete(org, shirts.id).await.unwrap();
        let names: Vec<String> = repo
            .list_active(org)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Blazers".to_string()]);

        repo.create(org, &category("Shirts")).await.unwrap();
        assert!(matches!(
            repo.soft_delete(org, shirts.id).await,
            Err(AppError::NotFound("Category"))
        ));
    }
}
