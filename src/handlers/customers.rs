// src/handlers/customers.rs

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
        rbac::{ManagerOrAbove, RequireRole},
        validation::ValidatedJson,
    },
    models::{
        billing::Bill,
        crm::{Customer, CustomerDetail, CustomerPayload, Measurement, MeasurementPayload},
    },
};

async fn ensure_customer(app_state: &AppState, organization_id: Uuid, id: Uuid) -> Result<Customer, AppError> {
    app_state
        .customer_repo
        .find_active(organization_id, id)
        .await?
        .ok_or(AppError::NotFound("Customer"))
}

#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    params(PaginationParams),
    responses((status = 200, description = "Customers", body = Paginated<Customer>)),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
) -> Result<Json<Paginated<Customer>>, AppError> {
    let (customers, total) = app_state
        .customer_repo
        .list(user.organization_id(), &pagination)
        .await?;
    Ok(Json(Paginated::new(customers, pagination.page, pagination.limit, total)))
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer with measurements", body = CustomerDetail),
        (status = 404, description = "Customer not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerDetail>, AppError> {
    let customer = ensure_customer(&app_state, user.organization_id(), id).await?;
    let measurements = app_state
        .customer_repo
        .list_measurements(user.organization_id(), id)
        .await?;
    Ok(Json(CustomerDetail { customer, measurements }))
}

#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Customers",
    request_body = CustomerPayload,
    responses(
        (status = 201, description = "Customer created", body = Customer),
        (status = 409, description = "Phone already registered")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    let customer = app_state
        .customer_repo
        .create(user.organization_id(), &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "Customers",
    request_body = CustomerPayload,
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer updated", body = Customer),
        (status = 404, description = "Customer not found"),
        (status = 409, description = "Phone already registered")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CustomerPayload>,
) -> Result<Json<Customer>, AppError> {
    let customer = app_state
        .customer_repo
        .update(user.organization_id(), id, &payload)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;
    Ok(Json(customer))
}

#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 204, description = "Customer deactivated"),
        (status = 404, description = "Customer not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !app_state.customer_repo.soft_delete(user.organization_id(), id).await? {
        return Err(AppError::NotFound("Customer"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}/bills",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses((status = 200, description = "Bill history, newest first", body = Vec<Bill>)),
    security(("api_jwt" = []))
)]
pub async fn customer_bills(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Bill>>, AppError> {
    app_state
        .customer_repo
        .find_any(user.organization_id(), id)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;
    let bills = app_state.bill_repo.list_for_customer(user.organization_id(), id).await?;
    Ok(Json(bills))
}

// ---
// Measurements
// ---

#[utoipa::path(
    get,
    path = "/api/customers/{id}/measurements",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses((status = 200, description = "Measurements", body = Vec<Measurement>)),
    security(("api_jwt" = []))
)]
pub async fn list_measurements(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Measurement>>, AppError> {
    ensure_customer(&app_state, user.organization_id(), id).await?;
    let measurements = app_state
        .customer_repo
        .list_measurements(user.organization_id(), id)
        .await?;
    Ok(Json(measurements))
}

#[utoipa::path(
    post,
    path = "/api/customers/{id}/measurements",
    tag = "Customers",
    request_body = MeasurementPayload,
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 201, description = "Measurement saved", body = Measurement),
        (status = 404, description = "Customer not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_measurement(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<MeasurementPayload>,
) -> Result<impl IntoResponse, AppError> {
    ensure_customer(&app_state, user.organization_id(), id).await?;
    let measurement = app_state
        .customer_repo
        .create_measurement(user.organization_id(), id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(measurement)))
}

#[utoipa::path(
    put,
    path = "/api/customers/{id}/measurements/{mid}",
    tag = "Customers",
    request_body = MeasurementPayload,
    params(
        ("id" = Uuid, Path, description = "Customer id"),
        ("mid" = Uuid, Path, description = "Measurement id")
    ),
    responses(
        (status = 200, description = "Measurement updated", body = Measurement),
        (status = 404, description = "Measurement not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_measurement(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, mid)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<MeasurementPayload>,
) -> Result<Json<Measurement>, AppError> {
    ensure_customer(&app_state, user.organization_id(), id).await?;
    let measurement = app_state
        .customer_repo
        .update_measurement(user.organization_id(), id, mid, &payload)
        .await?
        .ok_or(AppError::NotFound("Measurement"))?;
    Ok(Json(measurement))
}

#[utoipa::path(
    delete,
    path = "/api/customers/{id}/measurements/{mid}",
    tag = "Customers",
    params(
        ("id" = Uuid, Path, description = "Customer id"),
        ("mid" = Uuid, Path, description = "Measurement id")
    ),
    responses(
        (status = 204, description = "Measurement deleted"),
        (status = 404, description = "Measurement not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_measurement(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, mid)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    if !app_state
        .customer_repo
        .delete_measurement(user.organization_id(), id, mid)
        .await?
    {
        return Err(AppError::NotFound("Measurement"));
    }
    Ok(StatusCode::NO_CONTENT)
}
