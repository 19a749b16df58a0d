// src/handlers/products.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Paginated},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        pagination::{Pagination, PaginationParams},
        rbac::{ManagerOrAbove, RequireRole},
        validation::ValidatedJson,
    },
    models::inventory::{CreateProductPayload, Product, ProductFilter, UpdateProductPayload},
    services::barcode_service,
};

async fn load_product(app_state: &AppState, organization_id: Uuid, id: Uuid) -> Result<Product, AppError> {
    app_state
        .product_repo
        .find_active(organization_id, id)
        .await?
        .ok_or(AppError::NotFound("Product"))
}

fn svg_response(svg: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "private, max-age=3600"),
        ],
        svg,
    )
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    params(PaginationParams, ProductFilter),
    responses((status = 200, description = "Products", body = Paginated<Product>)),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Paginated<Product>>, AppError> {
    let (products, total) = app_state
        .product_repo
        .list(user.organization_id(), &pagination, &filter)
        .await?;
    Ok(Json(Paginated::new(products, pagination.page, pagination.limit, total)))
}

#[utoipa::path(
    get,
    path = "/api/products/low-stock",
    tag = "Products",
    responses((status = 200, description = "Products at or below their threshold", body = Vec<Product>)),
    security(("api_jwt" = []))
)]
pub async fn low_stock(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = app_state.product_repo.low_stock(user.organization_id()).await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Product not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(load_product(&app_state, user.organization_id(), id).await?))
}

#[utoipa::path(
    get,
    path = "/api/products/barcode/{code}",
    tag = "Products",
    params(("code" = String, Path, description = "Scanned barcode")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "No product with this barcode")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_by_barcode(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(code): Path<String>,
) -> Result<Json<Product>, AppError> {
    let product = app_state
        .product_repo
        .find_by_barcode(user.organization_id(), code.trim())
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    Ok(Json(product))
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 409, description = "SKU or barcode already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    ValidatedJson(payload): ValidatedJson<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state
        .inventory_service
        .create_product(user.organization_id(), user.id(), &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Products",
    request_body = UpdateProductPayload,
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 404, description = "Product not found"),
        (status = 409, description = "SKU or barcode already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateProductPayload>,
) -> Result<Json<Product>, AppError> {
    let product = app_state
        .inventory_service
        .update_product(user.organization_id(), id, &payload)
        .await?;
    Ok(Json(product))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deactivated"),
        (status = 404, description = "Product not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !app_state.product_repo.soft_delete(user.organization_id(), id).await? {
        return Err(AppError::NotFound("Product"));
    }
    tracing::info!(product_id = %id, "Product deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/barcode.svg",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Product id")),
    responses((status = 200, description = "Barcode label", content_type = "image/svg+xml", body = String)),
    security(("api_jwt" = []))
)]
pub async fn barcode_svg(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = load_product(&app_state, user.organization_id(), id).await?;
    let svg = barcode_service::barcode_svg(&product.barcode)?;
    Ok(svg_response(svg))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/qrcode.svg",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Product id")),
    responses((status = 200, description = "QR label", content_type = "image/svg+xml", body = String)),
    security(("api_jwt" = []))
)]
pub async fn qrcode_svg(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = load_product(&app_state, user.organization_id(), id).await?;
    let payload = json!({
        "sku": product.sku,
        "barcode": product.barcode,
        "name": product.name,
        "price": product.selling_price,
    });
    let svg = barcode_service::qr_svg(&payload.to_string())?;
    Ok(svg_response(svg))
}
