// src/models/crm.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::common::sanitize::{clean_opt, clean_opt_email, clean_string, clean_text, Sanitize};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub organization_id: Uuid,
    #[schema(example = "Anil Mehta")]
    pub name: String,
    #[schema(example = "9876543210")]
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "measurement_unit", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementUnit {
    Inch,
    Cm,
}

// One garment's set of body measurements, e.g. {"chest": 40.5, "sleeve": 24}.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: Uuid,
    pub customer_id: Uuid,
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub organization_id: Uuid,
    #[schema(example = "SHIRT")]
    pub garment_type: String,
    #[sqlx(rename = "measurement_values")]
    #[schema(value_type = Object)]
    pub values: Value,
    pub unit: MeasurementUnit,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub measurements: Vec<Measurement>,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    #[validate(length(min = 1, max = 120, message = "Name is required."))]
    #[schema(example = "Anil Mehta")]
    pub name: String,
    #[validate(length(min = 7, max = 20, message = "Phone must have 7 to 20 characters."))]
    #[schema(example = "98765 43210")]
    pub phone: Option<String>,
    #[validate(email(message = "The e-mail is invalid."))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl Sanitize for CustomerPayload {
    fn sanitize(&mut self) {
        clean_string(&mut self.name);
        clean_opt(&mut self.phone);
        clean_opt_email(&mut self.email);
        clean_opt(&mut self.address);
        clean_opt(&mut self.notes);
    }
}

fn validate_measurement_values(values: &BTreeMap<String, Decimal>) -> Result<(), ValidationError> {
    if values.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("At least one measurement is required.".into());
        return Err(err);
    }
    for (name, value) in values {
        if name.trim().is_empty() || name.len() > 40 {
            let mut err = ValidationError::new("name");
            err.message = Some("Measurement names must have 1 to 40 characters.".into());
            return Err(err);
        }
        if *value <= Decimal::ZERO {
            let mut err = ValidationError::new("range");
            err.message = Some(format!("Measurement '{}' must be a positive number.", name).into());
            return Err(err);
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementPayload {
    #[validate(length(min = 1, max = 40, message = "Garment type is required."))]
    #[schema(example = "SHIRT")]
    pub garment_type: String,
    #[validate(custom(function = "validate_measurement_values"))]
    #[schema(value_type = Object)]
    pub values: BTreeMap<String, Decimal>,
    #[serde(default = "default_unit")]
    pub unit: MeasurementUnit,
    pub notes: Option<String>,
}

fn default_unit() -> MeasurementUnit {
    MeasurementUnit::Inch
}

impl Sanitize for MeasurementPayload {
    fn sanitize(&mut self) {
        clean_string(&mut self.garment_type);
        self.garment_type = self
            .garment_type
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_uppercase();
        self.values = std::mem::take(&mut self.values)
            .into_iter()
            .map(|(k, v)| (clean_text(&k).to_lowercase(), v))
            .collect();
        clean_opt(&mut self.notes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(values: &[(&str, i64)]) -> MeasurementPayload {
        MeasurementPayload {
            garment_type: " sherwani  set ".into(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), Decimal::new(*v, 1)))
                .collect(),
            unit: MeasurementUnit::Inch,
            notes: None,
        }
    }

    #[test]
    fn measurement_payload_is_normalized() {
        let mut p = payload(&[(" Chest ", 405)]);
        p.sanitize();
        assert_eq!(p.garment_type, "SHERWANI_SET");
        assert_eq!(p.values.get("chest"), Some(&Decimal::new(405, 1)));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn rejects_empty_or_non_positive_measurements() {
        assert!(payload(&[]).validate().is_err());
        assert!(payload(&[("waist", 0)]).validate().is_err());
        assert!(payload(&[("waist", -10)]).validate().is_err());
    }

    #[test]
    fn customer_payload_sanitizes_contact_fields() {
        let mut p = CustomerPayload {
            name: " Anil ".into(),
            phone: Some("  ".into()),
            email: Some("ANIL@MAIL.COM".into()),
            address: None,
            notes: None,
        };
        p.sanitize();
        assert_eq!(p.name, "Anil");
        assert!(p.phone.is_none());
        assert_eq!(p.email.as_deref(), Some("anil@mail.com"));
        assert!(p.validate().is_ok());
    }
}
