// src/db/token_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Invitation, PasswordReset, UserRole},
};

// Invitations and password resets: single-use, time-limited, hashed tokens.
#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // --- Invitations ---

    pub async fn create_invitation(
        &self,
        organization_id: Uuid,
        email: &str,
        role: UserRole,
        token_hash: &str,
        invited_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation, AppError> {
        // A new invitation replaces any pending one for the same address.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM invitations
            WHERE organization_id = $1 AND email = $2 AND accepted_at IS NULL
            "#,
        )
        .bind(organization_id)
        .bind(email)
        .execute(&mut *tx)
        .await?;

        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO invitations (organization_id, email, role, token_hash, invited_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(email)
        .bind(role)
        .bind(token_hash)
        .bind(invited_by)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(invitation)
    }

    pub async fn find_invitation_for_update<'e, E>(
        &self,
        executor: E,
        token_hash: &str,
    ) -> Result<Option<Invitation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invitation = sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE token_hash = $1 FOR UPDATE",
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await?;
        Ok(invitation)
    }

    pub async fn mark_invitation_accepted<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE invitations SET accepted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_pending_invitations(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<Invitation>, AppError> {
        let invitations = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT * FROM invitations
            WHERE organization_id = $1 AND accepted_at IS NULL AND expires_at > NOW()
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invitations)
    }

    // --- Password resets ---

    pub async fn create_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordReset, AppError> {
        let reset = sqlx::query_as::<_, PasswordReset>(
            r#"
            INSERT INTO password_resets (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(reset)
    }

    pub async fn find_reset_for_update<'e, E>(
        &self,
        executor: E,
        token_hash: &str,
    ) -> Result<Option<PasswordReset>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reset = sqlx::query_as::<_, PasswordReset>(
            "SELECT * FROM password_resets WHERE token_hash = $1 FOR UPDATE",
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await?;
        Ok(reset)
    }

    // Burns every outstanding reset of the user, not only the one presented.
    pub async fn mark_resets_used<'e, E>(&self, executor: E, user_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE password_resets SET used_at = NOW() WHERE user_id = $1 AND used_at IS NULL")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
