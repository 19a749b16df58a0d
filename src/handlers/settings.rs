// src/handlers/settings.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AdminOnly, RequireRole},
        validation::ValidatedJson,
    },
    models::settings::{
        is_valid_setting_key, BusinessSettings, Setting, UpdateBusinessSettingsRequest, UpdateSettingRequest,
    },
};

fn check_key(key: &str) -> Result<(), AppError> {
    if !is_valid_setting_key(key) {
        return Err(AppError::BadRequest(
            "Setting keys must have 1 to 64 characters of a-z, 0-9, '_', '.' or '-'.".into(),
        ));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/settings/business",
    tag = "Settings",
    responses((status = 200, description = "Business profile", body = BusinessSettings)),
    security(("api_jwt" = []))
)]
pub async fn get_business(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<BusinessSettings>, AppError> {
    let settings = app_state.settings_repo.get_business(user.organization_id()).await?;
    Ok(Json(settings))
}

#[utoipa::path(
    put,
    path = "/api/settings/business",
    tag = "Settings",
    request_body = UpdateBusinessSettingsRequest,
    responses(
        (status = 200, description = "Business profile saved", body = BusinessSettings),
        (status = 400, description = "Invalid data")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_business(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    ValidatedJson(payload): ValidatedJson<UpdateBusinessSettingsRequest>,
) -> Result<Json<BusinessSettings>, AppError> {
    let settings = app_state
        .settings_repo
        .upsert_business(user.organization_id(), &payload)
        .await?;
    tracing::info!(organization_id = %user.organization_id(), "Business settings updated");
    Ok(Json(settings))
}

#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses((status = 200, description = "All key/value settings", body = Vec<Setting>)),
    security(("api_jwt" = []))
)]
pub async fn list_settings(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Setting>>, AppError> {
    let settings = app_state.settings_repo.list(user.organization_id()).await?;
    Ok(Json(settings))
}

#[utoipa::path(
    get,
    path = "/api/settings/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting", body = Setting),
        (status = 404, description = "Setting not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_setting(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(key): Path<String>,
) -> Result<Json<Setting>, AppError> {
    check_key(&key)?;
    let setting = app_state
        .settings_repo
        .get(user.organization_id(), &key)
        .await?
        .ok_or(AppError::NotFound("Setting"))?;
    Ok(Json(setting))
}

#[utoipa::path(
    put,
    path = "/api/settings/{key}",
    tag = "Settings",
    request_body = UpdateSettingRequest,
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting saved", body = Setting),
        (status = 400, description = "Invalid key")
    ),
    security(("api_jwt" = []))
)]
pub async fn put_setting(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSettingRequest>,
) -> Result<Json<Setting>, AppError> {
    check_key(&key)?;
    let setting = app_state
        .settings_repo
        .upsert(user.organization_id(), &key, &payload.value)
        .await?;
    Ok(Json(setting))
}

#[utoipa::path(
    delete,
    path = "/api/settings/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 204, description = "Setting removed"),
        (status = 404, description = "Setting not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_setting(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    check_key(&key)?;
    if !app_state.settings_repo.delete(user.organization_id(), &key).await? {
        return Err(AppError::NotFound("Setting"));
    }
    Ok(StatusCode::NO_CONTENT)
}
