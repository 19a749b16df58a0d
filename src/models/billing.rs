// src/models/billing.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::sanitize::{clean_opt, clean_opt_email, Sanitize},
    models::inventory::{validate_money, validate_positive_money},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "bill_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Pending,
    Partial,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Other,
}

impl PaymentMethod {
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::BankTransfer => "Bank transfer",
            PaymentMethod::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Uuid,
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub organization_id: Uuid,
    #[schema(example = "INV-20261019-0007")]
    pub bill_number: String,
    pub customer_id: Option<Uuid>,
    pub status: BillStatus,
    #[schema(example = "2398.00")]
    pub subtotal: Decimal,
    #[schema(example = "100.00")]
    pub discount_total: Decimal,
    #[schema(example = "114.90")]
    pub tax_total: Decimal,
    #[schema(example = "2412.90")]
    pub total_amount: Decimal,
    #[schema(example = "1000.00")]
    pub paid_amount: Decimal,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    pub fn balance_due(&self) -> Decimal {
        (self.total_amount - self.paid_amount).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub product_id: Uuid,
    // Snapshot taken at sale time so renames never rewrite history.
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub bill_id: Uuid,
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub organization_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub received_by: Option<Uuid>,
    pub paid_at: DateTime<Utc>,
}

// Bill list row with the customer name joined in.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub bill: Bill,
    pub customer_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: Bill,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub items: Vec<BillItem>,
    pub payments: Vec<Payment>,
    pub balance_due: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BillFilter {
    pub status: Option<BillStatus>,
    pub customer_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ---
// Payloads
// ---

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillItemPayload {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 100_000, message = "Quantity must be at least 1."))]
    #[schema(example = 2)]
    pub quantity: i32,
    /// Defaults to the product's selling price.
    #[validate(custom(function = "validate_money"))]
    pub unit_price: Option<Decimal>,
    #[validate(custom(function = "validate_money"))]
    #[serde(default)]
    pub discount: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    #[validate(custom(function = "validate_positive_money"))]
    #[schema(example = "500.00")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(length(max = 64, message = "Reference is too long."))]
    pub reference: Option<String>,
}

impl Sanitize for PaymentPayload {
    fn sanitize(&mut self) {
        clean_opt(&mut self.reference);
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillPayload {
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "A bill needs at least one item."), nested)]
    pub items: Vec<BillItemPayload>,
    /// Bill-level discount on top of line discounts.
    #[validate(custom(function = "validate_money"))]
    #[serde(default)]
    pub discount: Decimal,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Optional payment collected at the counter.
    #[validate(nested)]
    pub payment: Option<PaymentPayload>,
}

impl Sanitize for CreateBillPayload {
    fn sanitize(&mut self) {
        clean_opt(&mut self.notes);
        if let Some(payment) = self.payment.as_mut() {
            payment.sanitize();
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CancelBillPayload {
    #[validate(length(max = 255, message = "Reason is too long."))]
    pub reason: Option<String>,
}

impl Sanitize for CancelBillPayload {
    fn sanitize(&mut self) {
        clean_opt(&mut self.reason);
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WhatsAppQuery {
    /// Overrides the customer's phone number.
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct SendWhatsAppPayload {
    pub phone: Option<String>,
}

impl Sanitize for SendWhatsAppPayload {
    fn sanitize(&mut self) {
        clean_opt(&mut self.phone);
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppLink {
    #[schema(example = "https://wa.me/919876543210?text=...")]
    pub link: String,
    pub phone: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppDispatch {
    pub sent: bool,
    pub message_id: Option<String>,
    pub link: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct EmailInvoicePayload {
    #[validate(email(message = "The e-mail is invalid."))]
    pub email: Option<String>,
}

impl Sanitize for EmailInvoicePayload {
    fn sanitize(&mut self) {
        clean_opt_email(&mut self.email);
    }
}

// ---
// Computed amounts (server-side only)
// ---

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub tax_rate: Decimal,
    pub gross: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BillTotals {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub total_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::validation::OptionalValidatedJson;
    use axum::{
        body::Body,
        extract::{FromRequest, Request},
    };
    use serde_json::json;

    fn bill_payload(value: serde_json::Value) -> CreateBillPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn bill_items_are_validated() {
        let product_id = Uuid::new_v4();
        let ok = bill_payload(json!({
            "items": [{ "productId": product_id, "quantity": 2, "unitPrice": 499.5 }],
            "payment": { "amount": 500.0, "method": "UPI" }
        }));
        assert!(ok.validate().is_ok());

        let empty = bill_payload(json!({ "items": [] }));
        assert!(empty.validate().is_err());

        let zero_qty = bill_payload(json!({ "items": [{ "productId": product_id, "quantity": 0 }] }));
        assert!(zero_qty.validate().is_err());
    }

    #[test]
    fn amounts_are_limited_to_cents() {
        let product_id = Uuid::new_v4();
        let sub_cent_payment = bill_payload(json!({
            "items": [{ "productId": product_id, "quantity": 1 }],
            "payment": { "amount": 0.004, "method": "CASH" }
        }));
        assert!(sub_cent_payment.validate().is_err());

        let sub_cent_price = bill_payload(json!({
            "items": [{ "productId": product_id, "quantity": 1, "unitPrice": 10.125 }]
        }));
        assert!(sub_cent_price.validate().is_err());

        let payment: PaymentPayload =
            serde_json::from_value(json!({ "amount": 10.5, "method": "CARD" })).unwrap();
        assert!(payment.validate().is_ok());
    }

    #[tokio::test]
    async fn cancel_accepts_a_bodyless_post() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/bills/1/cancel")
            .body(Body::empty())
            .unwrap();

        let OptionalValidatedJson(payload) = OptionalValidatedJson::<CancelBillPayload>::from_request(req, &())
            .await
            .unwrap();
        assert!(payload.reason.is_none());
    }
}
