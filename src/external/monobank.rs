use crate::config::MonobankConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceResponse {
    #[serde(rename = "invoiceId")]
    pub invoice_id: String,
    #[serde(rename = "pageUrl")]
    pub page_url: String,
}

/// Webhook payload delivered by Monobank on invoice status changes.
#[derive(Debug, Serialize, Deserialize)]
pub struct MonobankWebhook {
    #[serde(rename = "invoiceId")]
    pub invoice_id: String,
    pub status: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default, rename = "failureReason")]
    pub failure_reason: Option<String>,
}

impl MonobankWebhook {
    pub fn is_paid(&self) -> bool {
        self.status == "success"
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status.as_str(), "failure" | "expired" | "reversed")
    }
}

#[derive(Clone)]
pub struct MonobankService {
    client: Client,
    config: MonobankConfig,
}

impl MonobankService {
    pub fn new(config: MonobankConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.token.is_empty()
    }

    /// Create a payment invoice for an order. `reference` carries the order id
    /// so the webhook can map the payment back.
    pub async fn create_invoice(
        &self,
        reference: &str,
        amount_cents: i64,
        destination: &str,
    ) -> AppResult<CreateInvoiceResponse> {
        let url = format!("{}/api/merchant/invoice/create", self.config.base_url);

        let mut body = json!({
            "amount": amount_cents,
            "ccy": 980, // UAH
            "merchantPaymInfo": {
                "reference": reference,
                "destination": destination,
            },
        });
        if !self.config.redirect_url.is_empty() {
            body["redirectUrl"] = json!(self.config.redirect_url);
        }
        if !self.config.webhook_url.is_empty() {
            body["webHookUrl"] = json!(self.config.webhook_url);
        }

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(15))
            .header("X-Token", &self.config.token)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            let invoice: CreateInvoiceResponse = response.json().await?;
            log::info!("Monobank invoice created: {}", invoice.invoice_id);
            Ok(invoice)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Monobank invoice creation failed: {error_text}");
            Err(AppError::ExternalApiError(format!(
                "Monobank invoice creation failed: {error_text}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_status_mapping() {
        let paid: MonobankWebhook = serde_json::from_value(serde_json::json!({
            "invoiceId": "inv1", "status": "success", "reference": "42"
        }))
        .unwrap();
        assert!(paid.is_paid());
        assert!(!paid.is_failed());

        let failed: MonobankWebhook = serde_json::from_value(serde_json::json!({
            "invoiceId": "inv2", "status": "expired"
        }))
        .unwrap();
        assert!(failed.is_failed());
    }
}
