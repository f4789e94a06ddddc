//! Delivery to a Telegram chat through the Bot API.

use std::future::Future;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use super::format::telegram_len;

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Sends one rendered payload to the destination chat.
pub trait Notifier {
    fn send(&self, payload: &str) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram rejected the message ({status}): {description}")]
    Rejected {
        status: reqwest::StatusCode,
        description: String,
    },
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// A [`Notifier`] posting HTML messages through `sendMessage`.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        TelegramNotifier {
            http,
            api_url: api_url.into(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_url.trim_end_matches('/'),
            self.bot_token
        )
    }

    async fn post(&self, payload: &str) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(self.send_message_url())
            .json(&json!({
                "chat_id": self.chat_id,
                "text": payload,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let reply: Option<ApiReply> = serde_json::from_str(&text).ok();

        match reply {
            Some(ApiReply { ok: true, .. }) if status.is_success() => {
                debug!(length = telegram_len(payload), "Telegram message sent");
                Ok(())
            }
            Some(ApiReply { description, .. }) => Err(DeliveryError::Rejected {
                status,
                description: description.unwrap_or(text),
            }),
            None => Err(DeliveryError::Rejected {
                status,
                description: text,
            }),
        }
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, payload: &str) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        let payload = payload.to_string();
        async move { self.post(&payload).await }
    }
}
