use crate::types::{InvokeRequest, InvokeResponse};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::primitives::Blob;
use tracing::debug;

/// Substituted when the model response has no `completion` field.
pub const COMPLETION_PLACEHOLDER: &str = "No completion found.";

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("failed to encode invoke request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("bedrock invoke_model failed: {0}")]
    Invoke(#[from] aws_sdk_bedrockruntime::Error),
    #[error("malformed model response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Text-completion model endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError>;
}

pub struct BedrockClient {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
    max_tokens: u32,
}

impl BedrockClient {
    pub fn new(client: aws_sdk_bedrockruntime::Client, model_id: String, max_tokens: u32) -> Self {
        Self {
            client,
            model_id,
            max_tokens,
        }
    }
}

#[async_trait]
impl InferenceClient for BedrockClient {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        let request = InvokeRequest {
            prompt,
            max_tokens_to_sample: self.max_tokens,
        };
        let body = serde_json::to_vec(&request).map_err(InferenceError::Encode)?;

        let response = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("*/*")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(aws_sdk_bedrockruntime::Error::from)?;

        debug!(model_id = %self.model_id, bytes = response.body().as_ref().len(), "bedrock response");

        parse_completion(response.body().as_ref())
    }
}

/// Extracts `completion` from a model response body.
pub fn parse_completion(body: &[u8]) -> Result<String, InferenceError> {
    let response: InvokeResponse = serde_json::from_slice(body).map_err(InferenceError::Decode)?;

    Ok(response
        .completion
        .unwrap_or_else(|| COMPLETION_PLACEHOLDER.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion() {
        let body = br#"{"completion":" OPTEMO is a consultancy.","stop_reason":"stop_sequence"}"#;

        assert_eq!(parse_completion(body).unwrap(), " OPTEMO is a consultancy.");
    }

    #[test]
    fn test_parse_completion_missing_field() {
        assert_eq!(
            parse_completion(br#"{"stop_reason":"max_tokens"}"#).unwrap(),
            COMPLETION_PLACEHOLDER
        );
    }

    #[test]
    fn test_parse_completion_malformed() {
        assert!(matches!(
            parse_completion(b"<html>"),
            Err(InferenceError::Decode(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let request = InvokeRequest {
            prompt: "\n\nHuman: hi\n\nAssistant:",
            max_tokens_to_sample: 600,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "prompt": "\n\nHuman: hi\n\nAssistant:",
                "max_tokens_to_sample": 600
            })
        );
    }
}
