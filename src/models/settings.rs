// src/models/settings.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::sanitize::{clean_opt, clean_opt_email, clean_string, Sanitize};
use crate::models::inventory::validate_percentage;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSettings {
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub organization_id: Uuid,

    #[schema(example = "Royal Tailors")]
    pub shop_name: String,

    #[schema(example = "12 MG Road, Pune")]
    pub address: Option<String>,

    #[schema(example = "+91 98765 43210")]
    pub phone: Option<String>,

    #[schema(example = "billing@royaltailors.in")]
    pub email: Option<String>,

    #[schema(example = "27AAPFU0939F1ZV")]
    pub tax_id: Option<String>,

    #[schema(example = "INR")]
    pub currency: String,

    #[schema(example = "5.00")]
    pub default_tax_rate: Decimal,

    #[schema(example = "INV")]
    pub invoice_prefix: String,

    #[schema(example = "Thank you for shopping with us!")]
    pub invoice_footer: Option<String>,

    #[schema(example = "royaltailors@okbank")]
    pub upi_id: Option<String>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl BusinessSettings {
    pub fn defaults(organization_id: Uuid, shop_name: &str) -> Self {
        Self {
            organization_id,
            shop_name: shop_name.to_string(),
            address: None,
            phone: None,
            email: None,
            tax_id: None,
            currency: "INR".to_string(),
            default_tax_rate: Decimal::ZERO,
            invoice_prefix: "INV".to_string(),
            invoice_footer: None,
            upi_id: None,
            updated_at: None,
        }
    }

    pub fn currency_symbol(&self) -> &str {
        match self.currency.as_str() {
            "INR" => "Rs.",
            "USD" => "$",
            "EUR" => "EUR ",
            "GBP" => "GBP ",
            other => other,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBusinessSettingsRequest {
    #[validate(length(min = 1, max = 120, message = "Shop name is required."))]
    #[schema(example = "Royal Tailors & Co.")]
    pub shop_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "The e-mail is invalid."))]
    pub email: Option<String>,
    pub tax_id: Option<String>,
    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code."))]
    #[schema(example = "INR")]
    pub currency: String,
    #[validate(custom(function = "validate_percentage"))]
    pub default_tax_rate: Decimal,
    #[validate(length(min = 1, max = 10, message = "Invoice prefix must have 1 to 10 characters."))]
    #[schema(example = "RT")]
    pub invoice_prefix: String,
    pub invoice_footer: Option<String>,
    pub upi_id: Option<String>,
}

impl Sanitize for UpdateBusinessSettingsRequest {
    fn sanitize(&mut self) {
        clean_string(&mut self.shop_name);
        clean_opt(&mut self.address);
        clean_opt(&mut self.phone);
        clean_opt_email(&mut self.email);
        clean_opt(&mut self.tax_id);
        clean_string(&mut self.currency);
        self.currency = self.currency.to_uppercase();
        clean_string(&mut self.invoice_prefix);
        self.invoice_prefix = self.invoice_prefix.to_uppercase();
        clean_opt(&mut self.invoice_footer);
        clean_opt(&mut self.upi_id);
    }
}

// Free-form key/value configuration.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    #[schema(example = "receipt.show_tax_breakup")]
    pub key: String,
    #[schema(value_type = Object)]
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSettingRequest {
    #[schema(value_type = Object)]
    pub value: Value,
}

/// Keys are 1..=64 characters of `[a-z0-9_.-]`.
pub fn is_valid_setting_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn setting_keys() {
        assert!(is_valid_setting_key("receipt.show_tax_breakup"));
        assert!(is_valid_setting_key("low-stock-alerts"));
        assert!(!is_valid_setting_key(""));
        assert!(!is_valid_setting_key("Upper"));
        assert!(!is_valid_setting_key("has space"));
        assert!(!is_valid_setting_key(&"k".repeat(65)));
    }

    #[test]
    fn business_settings_validation() {
        let mut req = UpdateBusinessSettingsRequest {
            shop_name: "  Royal Tailors ".into(),
            address: Some("".into()),
            phone: None,
            email: None,
            tax_id: None,
            currency: "inr".into(),
            default_tax_rate: Decimal::new(5, 0),
            invoice_prefix: "rt".into(),
            invoice_footer: None,
            upi_id: None,
        };
        req.sanitize();
        assert_eq!(req.shop_name, "Royal Tailors");
        assert!(req.address.is_none());
        assert_eq!(req.currency, "INR");
        assert_eq!(req.invoice_prefix, "RT");
        assert!(req.validate().is_ok());

        req.default_tax_rate = Decimal::new(101, 0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn organization_id_stays_off_the_wire() {
        let settings = BusinessSettings::defaults(Uuid::new_v4(), "Royal Tailors");
        let json = serde_json::to_value(&settings).unwrap();
        assert!(json.get("organizationId").is_none());
        assert_eq!(json["shopName"], "Royal Tailors");
    }
}
