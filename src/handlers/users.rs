// src/handlers/users.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Paginated},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        pagination::{Pagination, PaginationParams},
        rbac::{AdminOnly, RequireRole},
        validation::ValidatedJson,
    },
    models::auth::{Invitation, InvitationCreated, InviteUserPayload, UpdateRolePayload, User},
};

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    params(PaginationParams),
    responses((status = 200, description = "Users of the shop", body = Paginated<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    pagination: Pagination,
) -> Result<Json<Paginated<User>>, AppError> {
    let (users, total) = app_state
        .user_repo
        .list(user.organization_id(), &pagination)
        .await?;
    Ok(Json(Paginated::new(users, pagination.page, pagination.limit, total)))
}

#[utoipa::path(
    post,
    path = "/api/users/invitations",
    tag = "Users",
    request_body = InviteUserPayload,
    responses(
        (status = 201, description = "Invitation created", body = InvitationCreated),
        (status = 409, description = "E-mail already registered")
    ),
    security(("api_jwt" = []))
)]
pub async fn invite_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    ValidatedJson(payload): ValidatedJson<InviteUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    let created = app_state
        .auth_service
        .invite_user(&user, &payload.email, payload.role)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/users/invitations",
    tag = "Users",
    responses((status = 200, description = "Pending invitations", body = Vec<Invitation>)),
    security(("api_jwt" = []))
)]
pub async fn list_invitations(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
) -> Result<Json<Vec<Invitation>>, AppError> {
    let invitations = app_state
        .auth_service
        .list_pending_invitations(user.organization_id())
        .await?;
    Ok(Json(invitations))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    tag = "Users",
    request_body = UpdateRolePayload,
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 403, description = "Cannot change own role"),
        (status = 404, description = "User not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_role(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateRolePayload>,
) -> Result<Json<User>, AppError> {
    let updated = app_state.auth_service.change_role(&user, id, payload.role).await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deactivated"),
        (status = 403, description = "Cannot deactivate own account"),
        (status = 404, description = "User not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.auth_service.deactivate_user(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
