//! Request pipeline: parse, filter on mention, retrieve, prompt, infer, notify.

use crate::bedrock::InferenceClient;
use crate::config::Config;
use crate::kendra::{self, DocumentRetriever};
use crate::notifier::Notifier;
use crate::prompt;
use crate::slack::{self, ParsedEvent};
use crate::types::{HandlerResponse, InboundEvent};
use lambda_runtime::Error;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const INFERENCE_FAILURE_MESSAGE: &str = "Unable to call Bedrock API";

/// Long-lived state shared by every invocation.
#[derive(Clone)]
pub struct Handler {
    pub config: Arc<Config>,
    pub retriever: Arc<dyn DocumentRetriever>,
    pub inference: Arc<dyn InferenceClient>,
    pub notifier: Arc<dyn Notifier>,
}

impl Handler {
    pub async fn handle(&self, event: InboundEvent) -> Result<HandlerResponse, Error> {
        if let Some(secret) = self.config.signing_secret() {
            if !slack::verify_request(secret, &event) {
                warn!("rejected request with invalid slack signature");
                return Ok(HandlerResponse::new(401, json!("Unauthorized")));
            }
        }

        let text = match slack::parse_event(&event)? {
            ParsedEvent::Handshake { challenge } => {
                info!("answering url_verification handshake");
                return Ok(HandlerResponse::new(200, json!({ "challenge": challenge })));
            }
            ParsedEvent::Message { text } => text,
        };

        let Some(question) = slack::extract_question(&text, &self.config.slack_mention_id) else {
            info!("message does not mention the bot, ignoring");
            return Ok(HandlerResponse::new(200, json!("Event received")));
        };

        let passages = kendra::fetch_context(
            self.retriever.as_ref(),
            &question,
            self.config.kendra_top_n,
        )
        .await;
        info!(question_chars = question.chars().count(), passages = passages.len(), "retrieved context");

        let prompt = prompt::build_prompt(&question, &passages);

        let completion = match self.inference.complete(&prompt).await {
            Ok(completion) => completion,
            Err(e) => {
                error!(error = %e, prompt_chars = prompt.chars().count(), "error calling bedrock");
                return Ok(HandlerResponse::new(
                    502,
                    json!({ "error": INFERENCE_FAILURE_MESSAGE }),
                ));
            }
        };

        let slack_response = self
            .notifier
            .post_message(&self.config.slack_channel_id, &completion)
            .await?;
        info!(ok = slack_response.get("ok").and_then(|v| v.as_bool()), "slack response");

        Ok(HandlerResponse::new(200, json!("Message sent to Slack")))
    }
}
