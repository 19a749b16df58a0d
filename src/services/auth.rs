// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{OrganizationRepository, SettingsRepository, TokenRepository, UserRepository},
    models::auth::{AuthResponse, Claims, Invitation, InvitationCreated, User, UserRole},
    services::email_service::EmailService,
};

const INVITATION_TTL_DAYS: i64 = 7;
const PASSWORD_RESET_TTL_HOURS: i64 = 1;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    organization_repo: OrganizationRepository,
    token_repo: TokenRepository,
    settings_repo: SettingsRepository,
    email_service: EmailService,
    pool: PgPool,
    jwt_secret: String,
    jwt_expiration_hours: i64,
    app_base_url: String,
}

/// 256 bits of randomness, hex encoded.
pub fn generate_one_time_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Only this digest is stored; the raw token travels in the link.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("password hashing task failed: {e}"))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("password verification task failed: {e}"))??;
    Ok(valid)
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: UserRepository,
        organization_repo: OrganizationRepository,
        token_repo: TokenRepository,
        settings_repo: SettingsRepository,
        email_service: EmailService,
        pool: PgPool,
        jwt_secret: String,
        jwt_expiration_hours: i64,
        app_base_url: String,
    ) -> Self {
        Self {
            user_repo,
            organization_repo,
            token_repo,
            settings_repo,
            email_service,
            pool,
            jwt_secret,
            jwt_expiration_hours,
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
        }
    }

    // ---
    // Registration and login
    // ---

    /// Creates the shop, its first ADMIN and default business settings atomically.
    pub async fn register(
        &self,
        organization_name: &str,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AppError> {
        let hashed_password = hash_password(password).await?;

        let mut tx = self.pool.begin().await?;

        let organization = self.organization_repo.create(&mut *tx, organization_name).await?;
        let user = self
            .user_repo
            .create_user(&mut *tx, organization.id, name, email, &hashed_password, UserRole::Admin)
            .await?;
        self.settings_repo
            .insert_defaults(&mut *tx, organization.id, organization_name)
            .await?;

        tx.commit().await?;

        tracing::info!(organization_id = %organization.id, user_id = %user.id, "Organization registered");
        let token = self.create_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        self.user_repo.touch_last_login(user.id).await?;

        let token = self.create_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if !verify_password(current_password, &user.password_hash).await? {
            return Err(AppError::BadRequest("Current password is incorrect.".into()));
        }
        let hashed = hash_password(new_password).await?;
        self.user_repo.update_password(&self.pool, user.id, &hashed).await?;
        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    // ---
    // Tokens
    // ---

    pub fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.jwt_expiration_hours);

        let claims = Claims {
            sub: user.id,
            org: user.organization_id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    /// Verifies the JWT and loads its user. The role is re-read from the
    /// database so role changes apply without a new login.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_token(token)?;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if user.organization_id != claims.org {
            return Err(AppError::InvalidToken);
        }
        Ok(user)
    }

    // ---
    // Password reset
    // ---

    /// Never reveals whether the address is registered.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown address");
            return Ok(());
        };
        if !user.is_active {
            return Ok(());
        }

        let token = generate_one_time_token();
        let expires_at = Utc::now() + Duration::hours(PASSWORD_RESET_TTL_HOURS);
        self.token_repo
            .create_password_reset(user.id, &hash_token(&token), expires_at)
            .await?;

        let link = format!("{}/reset-password?token={}", self.app_base_url, token);
        if let Err(e) = self.email_service.send_password_reset(&user.email, &user.name, &link).await {
            tracing::warn!(user_id = %user.id, error = %e, "Could not send password reset e-mail");
        }
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let hashed = hash_password(new_password).await?;

        let mut tx = self.pool.begin().await?;

        let reset = self
            .token_repo
            .find_reset_for_update(&mut *tx, &hash_token(token))
            .await?
            .ok_or(AppError::InvalidOneTimeToken)?;

        if reset.used_at.is_some() || reset.expires_at <= Utc::now() {
            return Err(AppError::InvalidOneTimeToken);
        }

        self.user_repo.update_password(&mut *tx, reset.user_id, &hashed).await?;
        self.token_repo.mark_resets_used(&mut *tx, reset.user_id).await?;

        tx.commit().await?;
        tracing::info!(user_id = %reset.user_id, "Password reset completed");
        Ok(())
    }

    // ---
    // Invitations and user administration
    // ---

    pub async fn invite_user(
        &self,
        inviter: &User,
        email: &str,
        role: UserRole,
    ) -> Result<InvitationCreated, AppError> {
        if self.user_repo.find_by_email(email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let token = generate_one_time_token();
        let expires_at = Utc::now() + Duration::days(INVITATION_TTL_DAYS);
        let invitation = self
            .token_repo
            .create_invitation(
                inviter.organization_id,
                email,
                role,
                &hash_token(&token),
                inviter.id,
                expires_at,
            )
            .await?;

        let accept_url = format!("{}/accept-invitation?token={}", self.app_base_url, token);

        let shop_name = self
            .organization_repo
            .find_by_id(inviter.organization_id)
            .await?
            .map(|o| o.name)
            .unwrap_or_default();
        if let Err(e) = self.email_service.send_invitation(email, &shop_name, &accept_url).await {
            tracing::warn!(invitation_id = %invitation.id, error = %e, "Could not send invitation e-mail");
        }

        tracing::info!(invitation_id = %invitation.id, role = ?role, "Invitation created");
        Ok(InvitationCreated { invitation, accept_url })
    }

    pub async fn list_pending_invitations(&self, organization_id: Uuid) -> Result<Vec<Invitation>, AppError> {
        self.token_repo.list_pending_invitations(organization_id).await
    }

    pub async fn accept_invitation(
        &self,
        token: &str,
        name: &str,
        password: &str,
    ) -> Result<AuthResponse, AppError> {
        let hashed_password = hash_password(password).await?;

        let mut tx = self.pool.begin().await?;

        let invitation = self
            .token_repo
            .find_invitation_for_update(&mut *tx, &hash_token(token))
            .await?
            .ok_or(AppError::InvalidOneTimeToken)?;

        if invitation.accepted_at.is_some() || invitation.expires_at <= Utc::now() {
            return Err(AppError::InvalidOneTimeToken);
        }

        let user = self
            .user_repo
            .create_user(
                &mut *tx,
                invitation.organization_id,
                name,
                &invitation.email,
                &hashed_password,
                invitation.role,
            )
            .await?;
        self.token_repo.mark_invitation_accepted(&mut *tx, invitation.id).await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, invitation_id = %invitation.id, "Invitation accepted");
        let token = self.create_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn change_role(&self, actor: &User, target_id: Uuid, role: UserRole) -> Result<User, AppError> {
        if actor.id == target_id && role != actor.role {
            return Err(AppError::Forbidden("You cannot change your own role.".into()));
        }
        let user = self
            .user_repo
            .update_role(actor.organization_id, target_id, role)
            .await?
            .ok_or(AppError::NotFound("User"))?;
        tracing::info!(user_id = %user.id, role = ?role, "Role changed");
        Ok(user)
    }

    pub async fn deactivate_user(&self, actor: &User, target_id: Uuid) -> Result<(), AppError> {
        if actor.id == target_id {
            return Err(AppError::Forbidden("You cannot deactivate your own account.".into()));
        }
        if !self.user_repo.deactivate(actor.organization_id, target_id).await? {
            return Err(AppError::NotFound("User"));
        }
        tracing::info!(user_id = %target_id, "User deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{lazy_state, seeded_state};

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Ravi".into(),
            email: "ravi@shop.in".into(),
            password_hash: String::new(),
            role: UserRole::Manager,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn jwt_round_trip() {
        let state = lazy_state();
        let user = sample_user();

        let token = state.auth_service.create_token(&user).unwrap();
        let claims = state.auth_service.decode_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.org, user.organization_id);
        assert_eq!(claims.role, UserRole::Manager);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn expired_jwt_is_rejected() {
        let state = lazy_state();
        let user = sample_user();
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: user.id,
            org: user.organization_id,
            role: user.role,
            exp: past.timestamp() as usize,
            iat: (past - Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(crate::config::test_support::TEST_SECRET.as_ref()),
        )
        .unwrap();

        assert!(matches!(
            state.auth_service.decode_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn jwt_signed_with_other_secret_is_rejected() {
        let state = lazy_state();
        let user = sample_user();
        let claims = Claims {
            sub: user.id,
            org: user.organization_id,
            role: user.role,
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
            iat: Utc::now().timestamp() as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"someone-else"),
        )
        .unwrap();

        assert!(state.auth_service.decode_token(&token).is_err());
    }

    #[test]
    fn one_time_tokens_are_random_and_hashed() {
        let a = generate_one_time_token();
        let b = generate_one_time_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);

        let digest = hash_token(&a);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token(&a));
        assert_ne!(digest, a);
    }

    #[test]
    fn sha256_hex_matches_reference() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
    #[sqlx::test]
    async fn reset_tokens_expire_and_work_once(pool: PgPool) {
        let (state, admin) = seeded_state(pool).await;
        let auth = &state.auth_service;

        let fresh = generate_one_time_token();
        auth.token_repo
            .create_password_reset(admin.id, &hash_token(&fresh), Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        let stale = generate_one_time_token();
        auth.token_repo
            .create_password_reset(admin.id, &hash_token(&stale), Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        assert!(matches!(
            auth.reset_password(&stale, "new-password-1").await,
            Err(AppError::InvalidOneTimeToken)
        ));
        auth.reset_password(&fresh, "new-password-1").await.unwrap();
        assert!(matches!(
            auth.reset_password(&fresh, "new-password-2").await,
            Err(AppError::InvalidOneTimeToken)
        ));

        auth.login(&admin.email, "new-password-1").await.unwrap();
    }

    #[sqlx::test]
    async fn invitations_are_accepted_once_and_expire(pool: PgPool) {
        let (state, admin) = seeded_state(pool.clone()).await;
        let auth = &state.auth_service;

        let created = auth.invite_user(&admin, "meena@royaltailors.in", UserRole::Staff).await.unwrap();
        let token = created.accept_url.rsplit("token=").next().unwrap().to_string();

        let joined = auth.accept_invitation(&token, "Meena", "stitch-and-hem").await.unwrap();
        assert_eq!(joined.user.organization_id, admin.organization_id);
        assert_eq!(joined.user.role, UserRole::Staff);
        assert!(matches!(
            auth.accept_invitation(&token, "Meena", "stitch-and-hem").await,
            Err(AppError::InvalidOneTimeToken)
        ));

        let late = auth.invite_user(&admin, "arun@royaltailors.in", UserRole::Manager).await.unwrap();
        sqlx::query("UPDATE invitations SET expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1")
            .bind(late.invitation.id)
            .execute(&pool)
            .await
            .unwrap();
        let late_token = late.accept_url.rsplit("token=").next().unwrap().to_string();
        assert!(matches!(
            auth.accept_invitation(&late_token, "Arun", "measure-twice").await,
            Err(AppError::InvalidOneTimeToken)
        ));

        assert!(matches!(
            auth.invite_user(&admin, "ravi@royaltailors.in", UserRole::Staff).await,
            Err(AppError::EmailAlreadyExists)
        ));
    }
}
