mod bedrock;
mod config;
mod handler;
mod kendra;
mod notifier;
mod prompt;
mod slack;
mod types;

use aws_config::{BehaviorVersion, Region};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use tracing::info;
use types::{HandlerResponse, InboundEvent};

async fn function_handler(
    handler: &handler::Handler,
    event: LambdaEvent<InboundEvent>,
) -> Result<HandlerResponse, Error> {
    handler.handle(event.payload).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let config = config::Config::from_env()?;

    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_service_region.clone()))
        .load()
        .await;

    let retriever = kendra::KendraRetriever::new(
        aws_sdk_kendra::Client::new(&aws_config),
        config.kendra_index_id.clone(),
        config.kendra_language_code.clone(),
        config.kendra_top_n,
    );
    let inference = bedrock::BedrockClient::new(
        aws_sdk_bedrockruntime::Client::new(&aws_config),
        config.bedrock_model_id.clone(),
        config.bedrock_max_tokens,
    );
    let notifier = notifier::SlackNotifier::new(
        config.slack_bot_token.clone(),
        config.slack_api_base_url.clone(),
    );

    info!(
        region = %config.aws_service_region,
        model_id = %config.bedrock_model_id,
        signature_verification = config.signing_secret().is_some(),
        "handler initialized"
    );

    let handler = handler::Handler {
        config: Arc::new(config),
        retriever: Arc::new(retriever),
        inference: Arc::new(inference),
        notifier: Arc::new(notifier),
    };

    run(service_fn(|event: LambdaEvent<InboundEvent>| {
        let handler = handler.clone();
        async move { function_handler(&handler, event).await }
    }))
    .await
}
