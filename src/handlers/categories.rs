// src/handlers/categories.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{ManagerOrAbove, RequireRole},
        validation::ValidatedJson,
    },
    models::inventory::{Category, CategoryPayload},
};

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Categories",
    responses((status = 200, description = "Active categories", body = Vec<Category>)),
    security(("api_jwt" = []))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = app_state.category_repo.list_active(user.organization_id()).await?;
    Ok(Json(categories))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "Categories",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Name already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    ValidatedJson(payload): ValidatedJson<CategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    let category = app_state
        .category_repo
        .create(user.organization_id(), &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "Categories",
    request_body = CategoryPayload,
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 404, description = "Category not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_category(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CategoryPayload>,
) -> Result<Json<Category>, AppError> {
    let category = app_state
        .category_repo
        .update(user.organization_id(), id, &payload)
        .await?
        .ok_or(AppError::NotFound("Category"))?;
    Ok(Json(category))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "Categories",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deactivated"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still has active products")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_category(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.category_repo.soft_delete(user.organization_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
