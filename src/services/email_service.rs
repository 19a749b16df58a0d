// src/services/email_service.rs

use serde_json::json;
use std::time::Duration;

use crate::{common::error::AppError, config::MailConfig};

// Outbound mail through an HTTP mail API. Without configuration the message
// is only logged, which is enough for local development.
#[derive(Clone)]
pub struct EmailService {
    config: Option<MailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(config: Option<MailConfig>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let Some(config) = &self.config else {
            tracing::info!(%to, %subject, "Mail API not configured, message logged instead:\n{}", body);
            return Ok(());
        };

        let response = self
            .client
            .post(&config.api_url)
            .bearer_auth(&config.api_key)
            .json(&json!({
                "from": config.from,
                "to": [to],
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("mail API unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!("mail API returned {status}: {detail}")));
        }

        tracing::info!(%to, %subject, "E-mail sent");
        Ok(())
    }

    pub async fn send_password_reset(&self, to: &str, name: &str, link: &str) -> Result<(), AppError> {
        let body = format!(
            "Hello {name},\n\n\
             We received a request to reset your password. Open the link below within one hour:\n\n\
             {link}\n\n\
             If you did not ask for this, you can ignore this message."
        );
        self.send(to, "Reset your password", &body).await
    }

    pub async fn send_invitation(&self, to: &str, shop_name: &str, link: &str) -> Result<(), AppError> {
        let body = format!(
            "You have been invited to join {shop_name}.\n\n\
             Accept the invitation within 7 days:\n\n\
             {link}"
        );
        self.send(to, &format!("Invitation to {shop_name}"), &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_mail_is_logged_not_sent() {
        let service = EmailService::new(None);
        assert!(!service.is_configured());
        assert!(service.send("a@b.in", "Hi", "Body").await.is_ok());
    }
}
