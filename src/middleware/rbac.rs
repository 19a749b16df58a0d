// src/middleware/rbac.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use std::marker::PhantomData;

use crate::{
    common::error::ApiError,
    middleware::auth::AuthenticatedUser,
    models::auth::UserRole,
};

/// A set of roles allowed through a route.
pub trait RoleGuard: Send + Sync + 'static {
    fn allowed() -> &'static [UserRole];
}

/// Extractor that rejects the request unless the user's role is allowed by `T`.
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleGuard,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "User is not authenticated."))?;

        let role = user.0.role;
        if !T::allowed().contains(&role) {
            tracing::warn!(user_id = %user.0.id, ?role, "Role check failed");
            return Err(ApiError::new(
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// Guards
// ---

pub struct AdminOnly;
impl RoleGuard for AdminOnly {
    fn allowed() -> &'static [UserRole] {
        &[UserRole::Admin]
    }
}

pub struct ManagerOrAbove;
impl RoleGuard for ManagerOrAbove {
    fn allowed() -> &'static [UserRole] {
        &[UserRole::Admin, UserRole::Manager]
    }
}

pub struct AnyStaff;
impl RoleGuard for AnyStaff {
    fn allowed() -> &'static [UserRole] {
        &[UserRole::Admin, UserRole::Manager, UserRole::Staff]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::User;
    use axum::http::Request;
    use chrono::Utc;
    use uuid::Uuid;

    fn parts_with_role(role: Option<UserRole>) -> Parts {
        let mut request = Request::builder().uri("/").body(()).unwrap();
        if let Some(role) = role {
            let now = Utc::now();
            request.extensions_mut().insert(AuthenticatedUser(User {
                id: Uuid::new_v4(),
                organization_id: Uuid::new_v4(),
                name: "Test".into(),
                email: "t@shop.in".into(),
                password_hash: String::new(),
                role,
                is_active: true,
                last_login_at: None,
                created_at: now,
                updated_at: now,
            }));
        }
        request.into_parts().0
    }

    #[tokio::test]
    async fn staff_is_rejected_from_manager_routes() {
        let mut parts = parts_with_role(Some(UserRole::Staff));
        let err = RequireRole::<ManagerOrAbove>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn manager_passes_manager_routes_but_not_admin_routes() {
        let mut parts = parts_with_role(Some(UserRole::Manager));
        assert!(RequireRole::<ManagerOrAbove>::from_request_parts(&mut parts, &()).await.is_ok());
        assert!(RequireRole::<AdminOnly>::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let mut parts = parts_with_role(None);
        let err = RequireRole::<AnyStaff>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
