// src/handlers/bills.rs

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
        validation::{OptionalValidatedJson, ValidatedJson},
    },
    models::billing::{
        BillDetail, BillFilter, BillSummary, CancelBillPayload, CreateBillPayload, EmailInvoicePayload,
        PaymentPayload, SendWhatsAppPayload, WhatsAppDispatch, WhatsAppLink, WhatsAppQuery,
    },
    services::whatsapp_service::{invoice_message, wa_link},
};

#[utoipa::path(
    post,
    path = "/api/bills",
    tag = "Bills",
    request_body = CreateBillPayload,
    responses(
        (status = 201, description = "Bill created, stock decremented", body = BillDetail),
        (status = 400, description = "Invalid items or payment"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_bill(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CreateBillPayload>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .billing_service
        .create_bill(user.organization_id(), user.id(), &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/api/bills",
    tag = "Bills",
    params(PaginationParams, BillFilter),
    responses((status = 200, description = "Bills", body = Paginated<BillSummary>)),
    security(("api_jwt" = []))
)]
pub async fn list_bills(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    Query(filter): Query<BillFilter>,
) -> Result<Json<Paginated<BillSummary>>, AppError> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(AppError::BadRequest("'from' must not be after 'to'.".into()));
        }
    }
    let (bills, total) = app_state
        .bill_repo
        .list(user.organization_id(), &pagination, &filter)
        .await?;
    Ok(Json(Paginated::new(bills, pagination.page, pagination.limit, total)))
}

#[utoipa::path(
    get,
    path = "/api/bills/{id}",
    tag = "Bills",
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Bill with items and payments", body = BillDetail),
        (status = 404, description = "Bill not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_bill(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BillDetail>, AppError> {
    let detail = app_state.billing_service.get_detail(user.organization_id(), id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    post,
    path = "/api/bills/{id}/payments",
    tag = "Bills",
    request_body = PaymentPayload,
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 201, description = "Payment recorded", body = BillDetail),
        (status = 400, description = "Amount exceeds the balance due"),
        (status = 409, description = "Bill is cancelled")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_payment(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<PaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .billing_service
        .add_payment(user.organization_id(), user.id(), id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    post,
    path = "/api/bills/{id}/cancel",
    tag = "Bills",
    request_body = CancelBillPayload,
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Bill cancelled, stock restored", body = BillDetail),
        (status = 409, description = "Bill already cancelled")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_bill(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequireRole<ManagerOrAbove>,
    Path(id): Path<Uuid>,
    OptionalValidatedJson(payload): OptionalValidatedJson<CancelBillPayload>,
) -> Result<Json<BillDetail>, AppError> {
    let detail = app_state
        .billing_service
        .cancel_bill(user.organization_id(), user.id(), id, payload.reason.as_deref())
        .await?;
    Ok(Json(detail))
}

#[utoipa::path(
    get,
    path = "/api/bills/{id}/pdf",
    tag = "Bills",
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Invoice PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Bill not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn invoice_pdf(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.billing_service.get_detail(user.organization_id(), id).await?;
    let settings = app_state.settings_repo.get_business(user.organization_id()).await?;
    let filename = format!("{}.pdf", detail.bill.bill_number);

    let pdf = app_state.document_service.invoice_pdf(detail, settings).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("inline; filename=\"{filename}\"")),
        ],
        pdf,
    ))
}

// Phone override, else the customer's phone.
fn resolve_phone(app_state: &AppState, detail: &BillDetail, override_phone: Option<&str>) -> Result<String, AppError> {
    let raw = override_phone
        .or(detail.customer_phone.as_deref())
        .ok_or_else(|| AppError::BadRequest("The bill has no customer phone; pass one explicitly.".into()))?;
    app_state.whatsapp_service.normalize(raw)
}

#[utoipa::path(
    get,
    path = "/api/bills/{id}/whatsapp",
    tag = "Bills",
    params(("id" = Uuid, Path, description = "Bill id"), WhatsAppQuery),
    responses(
        (status = 200, description = "wa.me link with the invoice text", body = WhatsAppLink),
        (status = 400, description = "No usable phone number")
    ),
    security(("api_jwt" = []))
)]
pub async fn whatsapp_link(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<WhatsAppQuery>,
) -> Result<Json<WhatsAppLink>, AppError> {
    let detail = app_state.billing_service.get_detail(user.organization_id(), id).await?;
    let settings = app_state.settings_repo.get_business(user.organization_id()).await?;

    let phone = resolve_phone(&app_state, &detail, query.phone.as_deref())?;
    let link = wa_link(&phone, &invoice_message(&detail, &settings));
    Ok(Json(WhatsAppLink { link, phone }))
}

#[utoipa::path(
    post,
    path = "/api/bills/{id}/whatsapp",
    tag = "Bills",
    request_body = SendWhatsAppPayload,
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Sent via the Cloud API, or a link when it is not configured", body = WhatsAppDispatch),
        (status = 502, description = "WhatsApp API failure")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_whatsapp(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    OptionalValidatedJson(payload): OptionalValidatedJson<SendWhatsAppPayload>,
) -> Result<Json<WhatsAppDispatch>, AppError> {
    let detail = app_state.billing_service.get_detail(user.organization_id(), id).await?;
    let settings = app_state.settings_repo.get_business(user.organization_id()).await?;

    let phone = resolve_phone(&app_state, &detail, payload.phone.as_deref())?;
    let text = invoice_message(&detail, &settings);
    let link = wa_link(&phone, &text);

    if !app_state.whatsapp_service.is_configured() {
        return Ok(Json(WhatsAppDispatch { sent: false, message_id: None, link }));
    }

    let message_id = app_state.whatsapp_service.send_text(&phone, &text).await?;
    Ok(Json(WhatsAppDispatch { sent: true, message_id, link }))
}

#[utoipa::path(
    post,
    path = "/api/bills/{id}/email",
    tag = "Bills",
    request_body = EmailInvoicePayload,
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Invoice e-mailed"),
        (status = 400, description = "No e-mail address available"),
        (status = 502, description = "Mail API failure")
    ),
    security(("api_jwt" = []))
)]
pub async fn email_invoice(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    OptionalValidatedJson(payload): OptionalValidatedJson<EmailInvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.billing_service.get_detail(user.organization_id(), id).await?;
    let settings = app_state.settings_repo.get_business(user.organization_id()).await?;

    let to = payload
        .email
        .or_else(|| detail.customer_email.clone())
        .ok_or_else(|| AppError::BadRequest("The bill has no customer e-mail; pass one explicitly.".into()))?;

    let subject = format!("Invoice {} from {}", detail.bill.bill_number, settings.shop_name);
    app_state
        .email_service
        .send(&to, &subject, &invoice_message(&detail, &settings))
        .await?;

    Ok(Json(json!({ "sent": app_state.email_service.is_configured(), "to": to })))
}
