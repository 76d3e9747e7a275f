use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Envelope delivered by the Lambda trigger (API Gateway / function URL).
#[derive(Debug, Deserialize)]
pub struct InboundEvent {
    /// Either the raw request body as text or an already-decoded object.
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl InboundEvent {
    /// Case-insensitive header lookup; HTTP APIs lowercase names, REST APIs don't.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub event: Option<MessageEvent>,
}

#[derive(Debug, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub text: String,
}

/// Reduced search hit handed to the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "DocumentURI")]
    pub document_uri: String,
}

#[derive(Debug, Serialize)]
pub struct InvokeRequest<'a> {
    pub prompt: &'a str,
    pub max_tokens_to_sample: u32,
}

#[derive(Debug, Deserialize)]
pub struct InvokeResponse {
    #[serde(default)]
    pub completion: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostMessageRequest<'a> {
    pub channel: &'a str,
    pub text: &'a str,
}

/// Response returned to the trigger; every path uses this shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn new(status_code: u16, body: Value) -> Self {
        Self {
            status_code,
            body: body.to_string(),
        }
    }
}
