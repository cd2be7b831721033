use crate::config::NovaPoshtaConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct NovaPoshtaResponse {
    success: bool,
    #[serde(default)]
    data: Vec<TrackingDocument>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingDocument {
    #[serde(rename = "Number")]
    pub number: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "StatusCode", default)]
    pub status_code: String,
}

impl TrackingDocument {
    /// Nova Poshta status code 9 means the parcel was received.
    pub fn is_delivered(&self) -> bool {
        self.status_code == "9"
    }
}

#[derive(Clone)]
pub struct NovaPoshtaService {
    client: Client,
    config: NovaPoshtaConfig,
}

impl NovaPoshtaService {
    pub fn new(config: NovaPoshtaConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    /// Fetch the current tracking status of a shipment.
    pub async fn track(&self, tracking_number: &str) -> AppResult<TrackingDocument> {
        let body = json!({
            "apiKey": self.config.api_key,
            "modelName": "TrackingDocument",
            "calledMethod": "getStatusDocuments",
            "methodProperties": {
                "Documents": [{ "DocumentNumber": tracking_number }]
            }
        });

        let response = self
            .client
            .post(&self.config.base_url)
            .timeout(Duration::from_secs(15))
            .json(&body)
            .send()
            .await?;

        let parsed: NovaPoshtaResponse = response.json().await?;

        if !parsed.success {
            return Err(AppError::ExternalApiError(format!(
                "Nova Poshta tracking failed: {}",
                parsed.errors.join("; ")
            )));
        }

        parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("No tracking data for {tracking_number}")))
    }
}
