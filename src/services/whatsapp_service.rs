// src/services/whatsapp_service.rs

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::{
    common::error::AppError,
    config::WhatsAppConfig,
    models::{billing::BillDetail, settings::BusinessSettings},
};

#[derive(Clone)]
pub struct WhatsAppService {
    config: Option<WhatsAppConfig>,
    default_country_code: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CloudApiResponse {
    #[serde(default)]
    messages: Vec<CloudApiMessage>,
}

#[derive(Debug, Deserialize)]
struct CloudApiMessage {
    id: String,
}

/// Digits only, with the country code prefixed to bare 10-digit numbers.
/// Anything shorter than 10 digits is rejected.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.trim_start_matches('0');
    match digits.len() {
        0..=9 => None,
        10 => Some(format!("{default_country_code}{digits}")),
        _ => Some(digits.to_string()),
    }
}

pub fn wa_link(phone: &str, text: &str) -> String {
    format!("https://wa.me/{phone}?text={}", urlencoding::encode(text))
}

pub fn invoice_message(detail: &BillDetail, settings: &BusinessSettings) -> String {
    let bill = &detail.bill;
    let symbol = settings.currency_symbol();
    let mut lines = Vec::new();

    match &detail.customer_name {
        Some(name) => lines.push(format!("Hello {name},")),
        None => lines.push("Hello,".to_string()),
    }
    lines.push(format!(
        "Thank you for shopping at {}. Here is your invoice {} dated {}.",
        settings.shop_name,
        bill.bill_number,
        bill.created_at.format("%d-%m-%Y")
    ));
    lines.push(String::new());

    for item in &detail.items {
        lines.push(format!(
            "{} x{} = {symbol}{:.2}",
            item.product_name, item.quantity, item.line_total
        ));
    }

    lines.push(String::new());
    lines.push(format!("Total: {symbol}{:.2}", bill.total_amount));
    lines.push(format!("Paid: {symbol}{:.2}", bill.paid_amount));
    if detail.balance_due > rust_decimal::Decimal::ZERO {
        lines.push(format!("Balance due: {symbol}{:.2}", detail.balance_due));
        if let Some(upi) = &settings.upi_id {
            lines.push(format!("Pay by UPI: {upi}"));
        }
    }
    if let Some(footer) = &settings.invoice_footer {
        lines.push(String::new());
        lines.push(footer.clone());
    }

    lines.join("\n")
}

impl WhatsAppService {
    pub fn new(config: Option<WhatsAppConfig>, default_country_code: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            config,
            default_country_code,
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    pub fn normalize(&self, raw: &str) -> Result<String, AppError> {
        normalize_phone(raw, &self.default_country_code)
            .ok_or_else(|| AppError::BadRequest("Phone number must have at least 10 digits.".into()))
    }

    /// Sends a text message through the Cloud API and returns its message id.
    pub async fn send_text(&self, phone: &str, text: &str) -> Result<Option<String>, AppError> {
        let Some(config) = &self.config else {
            return Err(AppError::BadRequest("WhatsApp Cloud API is not configured".into()));
        };

        let url = format!(
            "{}/{}/messages",
            config.api_url.trim_end_matches('/'),
            config.phone_number_id
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_token)
            .json(&json!({
                "messaging_product": "whatsapp",
                "to": phone,
                "type": "text",
                "text": { "preview_url": false, "body": text },
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("WhatsApp API unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!("WhatsApp API returned {status}: {detail}")));
        }

        let body: CloudApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Unexpected WhatsApp API response: {e}")))?;

        let message_id = body.messages.into_iter().next().map(|m| m.id);
        tracing::info!(%phone, ?message_id, "WhatsApp message sent");
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::billing::{Bill, BillItem, BillStatus};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("98765 43210", "91").as_deref(), Some("919876543210"));
        assert_eq!(normalize_phone("+91-98765-43210", "91").as_deref(), Some("919876543210"));
        assert_eq!(normalize_phone("098765 43210", "91").as_deref(), Some("919876543210"));
        assert_eq!(normalize_phone("+1 (415) 555-2671", "91").as_deref(), Some("14155552671"));
        assert_eq!(normalize_phone("12345", "91"), None);
        assert_eq!(normalize_phone("", "91"), None);
    }

    #[test]
    fn link_is_url_encoded() {
        let link = wa_link("919876543210", "Total: Rs.100 & thanks");
        assert_eq!(
            link,
            "https://wa.me/919876543210?text=Total%3A%20Rs.100%20%26%20thanks"
        );
    }

    #[test]
    fn message_lists_items_and_balance() {
        let org = Uuid::new_v4();
        let created = Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap();
        let bill = Bill {
            id: Uuid::new_v4(),
            organization_id: org,
            bill_number: "INV-20261019-0001".into(),
            customer_id: None,
            status: BillStatus::Partial,
            subtotal: Decimal::new(1000, 0),
            discount_total: Decimal::ZERO,
            tax_total: Decimal::new(50, 0),
            total_amount: Decimal::new(1050, 0),
            paid_amount: Decimal::new(500, 0),
            notes: None,
            due_date: None,
            created_by: None,
            cancelled_at: None,
            created_at: created,
            updated_at: created,
        };
        let item = BillItem {
            id: Uuid::new_v4(),
            bill_id: bill.id,
            product_id: Uuid::new_v4(),
            product_name: "Linen Shirt".into(),
            quantity: 2,
            unit_price: Decimal::new(500, 0),
            discount: Decimal::ZERO,
            tax_rate: Decimal::new(5, 0),
            tax_amount: Decimal::new(50, 0),
            line_total: Decimal::new(1050, 0),
        };
        let detail = BillDetail {
            balance_due: bill.balance_due(),
            bill,
            customer_name: Some("Anil".into()),
            customer_phone: None,
            customer_email: None,
            items: vec![item],
            payments: vec![],
        };
        let mut settings = BusinessSettings::defaults(org, "Royal Tailors");
        settings.upi_id = Some("royal@okbank".into());

        let text = invoice_message(&detail, &settings);
        assert!(text.starts_with("Hello Anil,"));
        assert!(text.contains("INV-20261019-0001 dated 19-10-2026"));
        assert!(text.contains("Linen Shirt x2 = Rs.1050.00"));
        assert!(text.contains("Balance due: Rs.550.00"));
        assert!(text.contains("Pay by UPI: royal@okbank"));
    }
}
