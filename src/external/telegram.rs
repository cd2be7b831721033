use crate::config::TelegramConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

#[derive(Clone)]
pub struct TelegramService {
    client: Client,
    config: TelegramConfig,
}

impl TelegramService {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }

    /// Send a plain-text message to the configured chat.
    pub async fn send_message(&self, text: &str) -> AppResult<()> {
        if !self.is_configured() {
            log::debug!("Telegram is not configured, dropping message");
            return Ok(());
        }

        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.bot_token
        );

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(10))
            .json(&json!({
                "chat_id": self.config.chat_id,
                "text": text,
            }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Telegram sendMessage failed: {error_text}");
            Err(AppError::ExternalApiError(format!(
                "Telegram sendMessage failed: {error_text}"
            )))
        }
    }

    /// Best-effort variant: failures are logged, never propagated. Used for
    /// notifications that must not abort the primary transaction.
    pub async fn notify(&self, text: &str) {
        if let Err(e) = self.send_message(text).await {
            log::error!("Telegram notification dropped: {e:?}");
        }
    }
}
