// src/models/inventory.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::common::sanitize::{clean_opt, clean_string, Sanitize};

// --- 1. Categories ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub organization_id: Uuid,
    #[schema(example = "Shirts")]
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Products ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub organization_id: Uuid,
    pub category_id: Option<Uuid>,
    #[schema(example = "Linen Shirt")]
    pub name: String,
    #[schema(example = "SH-LIN-042")]
    pub sku: String,
    #[schema(example = "2000000000046")]
    pub barcode: String,
    pub description: Option<String>,
    #[schema(example = "42")]
    pub size: Option<String>,
    #[schema(example = "White")]
    pub color: Option<String>,
    #[schema(example = "Linen")]
    pub fabric: Option<String>,
    #[schema(example = "650.00")]
    pub cost_price: Decimal,
    #[schema(example = "1199.00")]
    pub selling_price: Decimal,
    #[schema(example = "5.00")]
    pub tax_rate: Decimal,
    #[schema(example = 12)]
    pub stock_quantity: i32,
    #[schema(example = 3)]
    pub low_stock_threshold: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }
}

// --- 3. Inventory movements ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    Adjustment,
}

// Append-only ledger. `quantity` is the signed change actually applied.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMovement {
    pub id: Uuid,
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub organization_id: Uuid,
    pub product_id: Uuid,
    pub movement_type: MovementType,
    #[schema(example = -2)]
    pub quantity: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub reason: Option<String>,
    #[schema(example = "INV-20261019-0007")]
    pub reference: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// Movement joined with the product name, for the history screen.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementWithProduct {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub movement: InventoryMovement,
    pub product_name: String,
    pub product_sku: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub low_stock: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub product_count: i64,
    pub total_units: i64,
    pub stock_value_at_cost: Decimal,
    pub stock_value_at_price: Decimal,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
}

// ---
// Payloads
// ---

/// Amounts are stored as NUMERIC(_, 2); "1.50" passes, "0.004" does not.
pub fn fits_two_decimals(val: Decimal) -> bool {
    val.normalize().scale() <= 2
}

fn two_decimals_error() -> ValidationError {
    let mut err = ValidationError::new("precision");
    err.message = Some("At most two decimal places are allowed.".into());
    err
}

pub(crate) fn validate_money(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("Value cannot be negative.".into());
        return Err(err);
    }
    if !fits_two_decimals(*val) {
        return Err(two_decimals_error());
    }
    Ok(())
}

pub(crate) fn validate_positive_money(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("Amount must be greater than zero.".into());
        return Err(err);
    }
    if !fits_two_decimals(*val) {
        return Err(two_decimals_error());
    }
    Ok(())
}

pub(crate) fn validate_percentage(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() || *val > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.message = Some("Percentage must be between 0 and 100.".into());
        return Err(err);
    }
    if !fits_two_decimals(*val) {
        return Err(two_decimals_error());
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    #[validate(length(min = 1, max = 80, message = "Name is required (max 80 characters)."))]
    #[schema(example = "Sherwanis")]
    pub name: String,
    pub description: Option<String>,
}

impl Sanitize for CategoryPayload {
    fn sanitize(&mut self) {
        clean_string(&mut self.name);
        clean_opt(&mut self.description);
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    pub category_id: Option<Uuid>,

    #[validate(length(min = 1, max = 160, message = "Name is required."))]
    #[schema(example = "Linen Shirt")]
    pub name: String,

    #[validate(length(min = 1, max = 64, message = "SKU is required."))]
    #[schema(example = "SH-LIN-042")]
    pub sku: String,

    // Generated when absent.
    #[validate(length(min = 4, max = 48, message = "Barcode must have 4 to 48 characters."))]
    pub barcode: Option<String>,

    pub description: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub fabric: Option<String>,

    #[validate(custom(function = "validate_money"))]
    #[serde(default)]
    pub cost_price: Decimal,

    #[validate(custom(function = "validate_money"))]
    pub selling_price: Decimal,

    /// Defaults to the shop's default tax rate.
    #[validate(custom(function = "validate_percentage"))]
    pub tax_rate: Option<Decimal>,

    #[validate(range(min = 0, message = "Initial stock cannot be negative."))]
    #[serde(default)]
    pub initial_stock: i32,

    #[validate(range(min = 0, message = "Threshold cannot be negative."))]
    #[serde(default)]
    pub low_stock_threshold: i32,
}

impl Sanitize for CreateProductPayload {
    fn sanitize(&mut self) {
        clean_string(&mut self.name);
        clean_string(&mut self.sku);
        self.sku = self.sku.to_uppercase();
        clean_opt(&mut self.barcode);
        clean_opt(&mut self.description);
        clean_opt(&mut self.size);
        clean_opt(&mut self.color);
        clean_opt(&mut self.fabric);
    }
}

// No stock field: stock only changes through movements.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 160, message = "Name is required."))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "SKU is required."))]
    pub sku: String,
    #[validate(length(min = 4, max = 48, message = "Barcode must have 4 to 48 characters."))]
    pub barcode: String,
    pub description: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub fabric: Option<String>,
    #[validate(custom(function = "validate_money"))]
    pub cost_price: Decimal,
    #[validate(custom(function = "validate_money"))]
    pub selling_price: Decimal,
    #[validate(custom(function = "validate_percentage"))]
    pub tax_rate: Decimal,
    #[validate(range(min = 0, message = "Threshold cannot be negative."))]
    pub low_stock_threshold: i32,
}

impl Sanitize for UpdateProductPayload {
    fn sanitize(&mut self) {
        clean_string(&mut self.name);
        clean_string(&mut self.sku);
        self.sku = self.sku.to_uppercase();
        clean_string(&mut self.barcode);
        clean_opt(&mut self.description);
        clean_opt(&mut self.size);
        clean_opt(&mut self.color);
        clean_opt(&mut self.fabric);
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovementPayload {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    /// IN/OUT: units to add or remove (> 0). ADJUSTMENT: the counted stock (>= 0).
    #[validate(range(min = 0, max = 1_000_000, message = "Quantity is out of range."))]
    #[schema(example = 10)]
    pub quantity: i32,
    #[validate(length(max = 255, message = "Reason is too long."))]
    #[schema(example = "Supplier delivery")]
    pub reason: Option<String>,
    #[validate(length(max = 64, message = "Reference is too long."))]
    pub reference: Option<String>,
}

impl Sanitize for CreateMovementPayload {
    fn sanitize(&mut self) {
        clean_opt(&mut self.reason);
        clean_opt(&mut self.reference);
    }
}
