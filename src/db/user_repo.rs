// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::{is_unique_violation, AppError},
    middleware::pagination::Pagination,
    models::auth::{User, UserRole},
};

// All access to the `users` table.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (organization_id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::EmailAlreadyExists;
            }
            e.into()
        })
    }

    pub async fn touch_last_login(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_password<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
        pagination: &Pagination,
    ) -> Result<(Vec<User>, i64), AppError> {
        let pattern = pagination.search_pattern();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE organization_id = ");
        count.push_bind(organization_id);
        if let Some(p) = &pattern {
            count.push(" AND (name ILIKE ").push_bind(p.clone());
            count.push(" OR email ILIKE ").push_bind(p.clone()).push(")");
        }
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE organization_id = ");
        query.push_bind(organization_id);
        if let Some(p) = &pattern {
            query.push(" AND (name ILIKE ").push_bind(p.clone());
            query.push(" OR email ILIKE ").push_bind(p.clone()).push(")");
        }
        query.push(" ORDER BY ");
        query.push(pagination.order_by(
            &[("name", "name"), ("email", "email"), ("createdAt", "created_at")],
            "created_at",
        ));
        query.push(" LIMIT ").push_bind(pagination.limit_i64());
        query.push(" OFFSET ").push_bind(pagination.offset());

        let users = query.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok((users, total))
    }

    pub async fn update_role(
        &self,
        organization_id: Uuid,
        id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET role = $3, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // Soft delete: the row stays so bills keep their `created_by`.
    pub async fn deactivate(&self, organization_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET is_active = FALSE, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2 AND is_active
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
