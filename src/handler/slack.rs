use crate::types::{InboundEvent, SlackEvent};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const URL_VERIFICATION: &str = "url_verification";
const MAX_CLOCK_SKEW_SECS: u64 = 60 * 5;

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("malformed event body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("url_verification event without a challenge")]
    MissingChallenge,
}

/// Normalized inbound event.
#[derive(Debug, PartialEq)]
pub enum ParsedEvent {
    /// Endpoint ownership check; the challenge must be echoed back.
    Handshake { challenge: String },
    Message { text: String },
}

/// Decodes the trigger body, which arrives either as JSON text or as an
/// already-decoded object.
pub fn parse_event(event: &InboundEvent) -> Result<ParsedEvent, EventError> {
    let slack_event: SlackEvent = match &event.body {
        Value::String(raw) => serde_json::from_str(raw)?,
        other => serde_json::from_value(other.clone())?,
    };

    if slack_event.event_type.as_deref() == Some(URL_VERIFICATION) {
        let challenge = slack_event.challenge.ok_or(EventError::MissingChallenge)?;
        return Ok(ParsedEvent::Handshake { challenge });
    }

    let text = slack_event.event.map(|e| e.text).unwrap_or_default();
    Ok(ParsedEvent::Message { text })
}

/// Returns the question addressed to the bot, or `None` when the mention
/// token is absent. A bare mention yields an empty question.
pub fn extract_question(text: &str, mention_id: &str) -> Option<String> {
    if mention_id.is_empty() || !text.contains(mention_id) {
        return None;
    }

    Some(text.replace(mention_id, "").trim().to_string())
}

pub fn verify_slack_signature(
    signing_secret: &str,
    body: &str,
    timestamp: &str,
    signature: &str,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let current_time = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    verify_slack_signature_at(signing_secret, body, timestamp, signature, current_time)
}

fn verify_slack_signature_at(
    signing_secret: &str,
    body: &str,
    timestamp: &str,
    signature: &str,
    current_time: u64,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let request_timestamp: u64 = timestamp.parse()?;

    if current_time.abs_diff(request_timestamp) > MAX_CLOCK_SKEW_SECS {
        return Ok(false);
    }

    let Some(provided) = signature
        .strip_prefix("v0=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
    else {
        return Ok(false);
    };

    let base_string = format!("v0:{}:{}", timestamp, body);

    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())?;
    mac.update(base_string.as_bytes());

    Ok(mac.verify_slice(&provided).is_ok())
}

/// Checks the Slack signature headers against the raw body. Bodies that were
/// already decoded upstream can't be verified and are rejected.
pub fn verify_request(signing_secret: &str, event: &InboundEvent) -> bool {
    let Value::String(body) = &event.body else {
        return false;
    };
    let timestamp = event.header("X-Slack-Request-Timestamp").unwrap_or("");
    let signature = event.header("X-Slack-Signature").unwrap_or("");

    verify_slack_signature(signing_secret, body, timestamp, signature).unwrap_or(false)
}
