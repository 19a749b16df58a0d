// src/handlers/inventory.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::{error::AppError, pagination::Paginated},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        pagination::{Pagination, PaginationParams},
        rbac::{ManagerOrAbove, RequireRole},
        validation::ValidatedJson,
    },
    models::inventory::{
        CreateMovementPayload, InventoryMovement, InventorySummary, MovementFilter, MovementWithProduct,
    },
};

#[utoipa::path(
    post,
    path = "/api/inventory/movements",
    tag = "Inventory",
    request_body = CreateMovementPayload,
    responses(
        (status = 201, description = "Movement recorded", body = InventoryMovement),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_movement(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    ValidatedJson(payload): ValidatedJson<CreateMovementPayload>,
) -> Result<impl IntoResponse, AppError> {
    let movement = app_state
        .inventory_service
        .create_movement(user.organization_id(), user.id(), &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/movements",
    tag = "Inventory",
    params(PaginationParams, MovementFilter),
    responses((status = 200, description = "Movement history", body = Paginated<MovementWithProduct>)),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    Query(filter): Query<MovementFilter>,
) -> Result<Json<Paginated<MovementWithProduct>>, AppError> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(AppError::BadRequest("'from' must not be after 'to'.".into()));
        }
    }
    let (movements, total) = app_state
        .product_repo
        .list_movements(user.organization_id(), &pagination, &filter)
        .await?;
    Ok(Json(Paginated::new(movements, pagination.page, pagination.limit, total)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/summary",
    tag = "Inventory",
    responses((status = 200, description = "Stock totals", body = InventorySummary)),
    security(("api_jwt" = []))
)]
pub async fn summary(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<InventorySummary>, AppError> {
    let summary = app_state.product_repo.inventory_summary(user.organization_id()).await?;
    Ok(Json(summary))
}
