use crate::types::PostMessageRequest;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("chat.postMessage request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Posts answers to a chat channel. The raw API response is returned as-is.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, channel: &str, text: &str) -> Result<Value, NotifyError>;
}

pub struct SlackNotifier {
    client: Client,
    bot_token: String,
    base_url: String,
}

impl SlackNotifier {
    pub fn new(bot_token: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            bot_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post_message(&self, channel: &str, text: &str) -> Result<Value, NotifyError> {
        let payload = PostMessageRequest { channel, text };
        debug!(channel, chars = text.chars().count(), "posting message to slack");

        let response: Value = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .header("Authorization", format!("Bearer {}", self.bot_token))
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        // Slack reports API failures in the body with HTTP 200.
        if response.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            warn!(
                error = response.get("error").and_then(|v| v.as_str()).unwrap_or("unknown"),
                "slack rejected chat.postMessage"
            );
        }

        Ok(response)
    }
}
