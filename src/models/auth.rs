// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::sanitize::{clean_email, clean_string, Sanitize};

// Maps the `user_role` enum in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Manager,
    Staff,
}

impl UserRole {
    fn rank(self) -> u8 {
        match self {
            UserRole::Admin => 3,
            UserRole::Manager => 2,
            UserRole::Staff => 1,
        }
    }

    /// True when this role has at least the privileges of `other`.
    pub fn at_least(self, other: UserRole) -> bool {
        self.rank() >= other.rank()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    #[schema(example = "Royal Tailors")]
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    #[schema(example = "Ravi Kumar")]
    pub name: String,
    #[schema(example = "ravi@royaltailors.in")]
    pub email: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: Uuid,
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub organization_id: Uuid,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub token_hash: String,
    pub invited_by: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordReset {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // user id
    pub org: Uuid,      // organization id
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(length(min = 2, max = 120, message = "Shop name must have 2 to 120 characters."))]
    #[schema(example = "Royal Tailors")]
    pub organization_name: String,
    #[validate(length(min = 2, max = 120, message = "Name must have 2 to 120 characters."))]
    #[schema(example = "Ravi Kumar")]
    pub name: String,
    #[validate(email(message = "The e-mail is invalid."))]
    #[schema(example = "ravi@royaltailors.in")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must have at least 8 characters."))]
    pub password: String,
}

impl Sanitize for RegisterUserPayload {
    fn sanitize(&mut self) {
        clean_string(&mut self.organization_name);
        clean_string(&mut self.name);
        clean_email(&mut self.email);
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "The e-mail is invalid."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

impl Sanitize for LoginUserPayload {
    fn sanitize(&mut self) {
        clean_email(&mut self.email);
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    #[validate(length(min = 1, message = "Current password is required."))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must have at least 8 characters."))]
    pub new_password: String,
}

impl Sanitize for ChangePasswordPayload {
    fn sanitize(&mut self) {}
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordPayload {
    #[validate(email(message = "The e-mail is invalid."))]
    pub email: String,
}

impl Sanitize for ForgotPasswordPayload {
    fn sanitize(&mut self) {
        clean_email(&mut self.email);
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordPayload {
    #[validate(length(min = 1, message = "Token is required."))]
    pub token: String,
    #[validate(length(min = 8, message = "Password must have at least 8 characters."))]
    pub new_password: String,
}

impl Sanitize for ResetPasswordPayload {
    fn sanitize(&mut self) {
        clean_string(&mut self.token);
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InviteUserPayload {
    #[validate(email(message = "The e-mail is invalid."))]
    #[schema(example = "staff@royaltailors.in")]
    pub email: String,
    pub role: UserRole,
}

impl Sanitize for InviteUserPayload {
    fn sanitize(&mut self) {
        clean_email(&mut self.email);
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AcceptInvitationPayload {
    #[validate(length(min = 1, message = "Token is required."))]
    pub token: String,
    #[validate(length(min = 2, max = 120, message = "Name must have 2 to 120 characters."))]
    pub name: String,
    #[validate(length(min = 8, message = "Password must have at least 8 characters."))]
    pub password: String,
}

impl Sanitize for AcceptInvitationPayload {
    fn sanitize(&mut self) {
        clean_string(&mut self.token);
        clean_string(&mut self.name);
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRolePayload {
    pub role: UserRole,
}

impl Sanitize for UpdateRolePayload {
    fn sanitize(&mut self) {}
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitationCreated {
    pub invitation: Invitation,
    // Returned so an admin can share the link by hand when mail is not configured.
    pub accept_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy() {
        assert!(UserRole::Admin.at_least(UserRole::Manager));
        assert!(UserRole::Manager.at_least(UserRole::Manager));
        assert!(UserRole::Manager.at_least(UserRole::Staff));
        assert!(!UserRole::Staff.at_least(UserRole::Manager));
        assert!(!UserRole::Manager.at_least(UserRole::Admin));
    }

    #[test]
    fn role_wire_format() {
        assert_eq!(serde_json::to_string(&UserRole::Manager).unwrap(), "\"MANAGER\"");
        let parsed: UserRole = serde_json::from_str("\"STAFF\"").unwrap();
        assert_eq!(parsed, UserRole::Staff);
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Ravi".into(),
            email: "ravi@shop.in".into(),
            password_hash: "$2b$12$secret".into(),
            role: UserRole::Admin,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["organizationId"], serde_json::json!(user.organization_id));
    }
}
