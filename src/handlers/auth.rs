// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, validation::ValidatedJson},
    models::auth::{
        AcceptInvitationPayload, AuthResponse, ChangePasswordPayload, ForgotPasswordPayload,
        LoginUserPayload, RegisterUserPayload, ResetPasswordPayload, User,
    },
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Shop and admin account created", body = AuthResponse),
        (status = 400, description = "Invalid data"),
        (status = 409, description = "E-mail already registered")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state
        .auth_service
        .register(&payload.organization_name, &payload.name, &payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account deactivated")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = app_state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current user", body = User)),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

#[utoipa::path(
    put,
    path = "/api/auth/me/password",
    tag = "Auth",
    request_body = ChangePasswordPayload,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Current password is incorrect")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_password(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordPayload>,
) -> Result<StatusCode, AppError> {
    app_state
        .auth_service
        .change_password(&user, &payload.current_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordPayload,
    responses((status = 200, description = "Reset link sent if the account exists"))
)]
pub async fn forgot_password(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ForgotPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state.auth_service.request_password_reset(&payload.email).await?;
    Ok(Json(json!({
        "message": "If the e-mail is registered, a reset link has been sent."
    })))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Invalid or expired link")
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .auth_service
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(Json(json!({ "message": "Password updated. You can now log in." })))
}

#[utoipa::path(
    post,
    path = "/api/auth/invitations/accept",
    tag = "Auth",
    request_body = AcceptInvitationPayload,
    responses(
        (status = 201, description = "Account created from invitation", body = AuthResponse),
        (status = 400, description = "Invalid or expired invitation"),
        (status = 409, description = "E-mail already registered")
    )
)]
pub async fn accept_invitation(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<AcceptInvitationPayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state
        .auth_service
        .accept_invitation(&payload.token, &payload.name, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}
