use crate::config::TikTokConfig;
use crate::error::{AppError, AppResult};
use crate::external::MatchData;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

const EVENTS_URL: &str = "https://business-api.tiktok.com/open_api/v1.3/event/track/";
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct TikTokResponse {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct TikTokEventsService {
    client: Client,
    config: TikTokConfig,
}

impl TikTokEventsService {
    pub fn new(config: TikTokConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.pixel_code.is_empty() && !self.config.access_token.is_empty()
    }

    pub async fn send_purchase(
        &self,
        match_data: &MatchData,
        value_cents: i64,
        order_id: i64,
    ) -> AppResult<()> {
        self.send_event(
            "CompletePayment",
            match_data,
            json!({
                "currency": "UAH",
                "value": value_cents as f64 / 100.0,
                "order_id": order_id.to_string(),
            }),
        )
        .await
    }

    pub async fn send_event(
        &self,
        event_name: &str,
        match_data: &MatchData,
        properties: Value,
    ) -> AppResult<()> {
        if !self.is_configured() {
            log::debug!("TikTok Events API is not configured, dropping {event_name}");
            return Ok(());
        }

        let mut user = json!({});
        if let Some(email) = &match_data.email {
            user["email"] = json!(crate::utils::sha256_normalized(email));
        }
        if let Some(phone) = &match_data.phone {
            user["phone"] = json!(crate::utils::sha256_normalized(phone));
        }

        let body = json!({
            "event_source": "web",
            "event_source_id": self.config.pixel_code,
            "data": [{
                "event": event_name,
                "event_time": Utc::now().timestamp(),
                "event_id": Uuid::new_v4().to_string(),
                "user": user,
                "properties": properties,
            }]
        });

        let mut delay_ms = RETRY_BASE_DELAY_MS;
        let mut last_error = String::new();

        for attempt in 1..=RETRY_ATTEMPTS {
            let result = self
                .client
                .post(EVENTS_URL)
                .timeout(Duration::from_secs(10))
                .header("Access-Token", &self.config.access_token)
                .json(&body)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    let parsed: TikTokResponse = response.json().await?;
                    if parsed.code == 0 {
                        return Ok(());
                    }
                    last_error = format!("code {}: {}", parsed.code, parsed.message);
                    log::warn!(
                        "TikTok event {event_name} attempt {attempt} rejected: {last_error}"
                    );
                }
                Ok(response) => {
                    last_error = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    log::warn!("TikTok event {event_name} attempt {attempt} failed: {last_error}");
                }
                Err(e) => {
                    last_error = e.to_string();
                    log::warn!("TikTok event {event_name} attempt {attempt} failed: {last_error}");
                }
            }

            if attempt < RETRY_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms *= 2;
            }
        }

        Err(AppError::ExternalApiError(format!(
            "TikTok event {event_name} failed after {RETRY_ATTEMPTS} attempts: {last_error}"
        )))
    }
}
