use crate::config::FacebookConfig;
use crate::error::{AppError, AppResult};
use crate::utils::sha256_normalized;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PII for Advanced Matching; values are SHA-256 hashed before sending.
#[derive(Debug, Default, Clone)]
pub struct MatchData {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl MatchData {
    fn to_user_data(&self) -> Value {
        let mut user_data = json!({});
        if let Some(email) = &self.email {
            user_data["em"] = json!([sha256_normalized(email)]);
        }
        if let Some(phone) = &self.phone {
            user_data["ph"] = json!([sha256_normalized(phone)]);
        }
        user_data
    }
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events_received: Option<i64>,
}

#[derive(Clone)]
pub struct FacebookCapiService {
    client: Client,
    config: FacebookConfig,
}

impl FacebookCapiService {
    pub fn new(config: FacebookConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.pixel_id.is_empty() && !self.config.access_token.is_empty()
    }

    pub async fn send_purchase(
        &self,
        match_data: &MatchData,
        value_cents: i64,
        order_id: i64,
    ) -> AppResult<()> {
        self.send_event(
            "Purchase",
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
        custom_data: Value,
    ) -> AppResult<()> {
        if !self.is_configured() {
            log::debug!("Facebook CAPI is not configured, dropping {event_name}");
            return Ok(());
        }

        let url = format!(
            "https://graph.facebook.com/{}/{}/events?access_token={}",
            self.config.api_version, self.config.pixel_id, self.config.access_token
        );

        let body = json!({
            "data": [{
                "event_name": event_name,
                "event_time": Utc::now().timestamp(),
                "event_id": Uuid::new_v4().to_string(),
                "action_source": "website",
                "user_data": match_data.to_user_data(),
                "custom_data": custom_data,
            }]
        });

        let mut delay_ms = RETRY_BASE_DELAY_MS;
        let mut last_error = String::new();

        for attempt in 1..=RETRY_ATTEMPTS {
            let result = self
                .client
                .post(&url)
                .timeout(Duration::from_secs(10))
                .json(&body)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    let parsed: EventsResponse = response.json().await?;
                    if parsed.events_received.unwrap_or(0) < 1 {
                        return Err(AppError::ExternalApiError(
                            "Facebook CAPI accepted the request but received no events"
                                .to_string(),
                        ));
                    }
                    return Ok(());
                }
                Ok(response) => {
                    last_error = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    log::warn!(
                        "Facebook CAPI {event_name} attempt {attempt} failed: {last_error}"
                    );
                }
                Err(e) => {
                    last_error = e.to_string();
                    log::warn!(
                        "Facebook CAPI {event_name} attempt {attempt} failed: {last_error}"
                    );
                }
            }

            if attempt < RETRY_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms *= 2;
            }
        }

        Err(AppError::ExternalApiError(format!(
            "Facebook CAPI {event_name} failed after {RETRY_ATTEMPTS} attempts: {last_error}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_data_hashes_pii() {
        let match_data = MatchData {
            email: Some(" Buyer@Example.com ".to_string()),
            phone: Some("+380501234567".to_string()),
        };
        let user_data = match_data.to_user_data();
        assert_eq!(
            user_data["em"][0],
            json!(sha256_normalized("buyer@example.com"))
        );
        // Raw PII must never appear in the payload.
        assert!(!user_data.to_string().contains("Buyer@Example.com"));
        assert!(!user_data.to_string().contains("+380501234567"));
    }

    #[test]
    fn test_user_data_omits_missing_fields() {
        let user_data = MatchData::default().to_user_data();
        assert!(user_data.get("em").is_none());
        assert!(user_data.get("ph").is_none());
    }
}
