use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use super::gateway::{InferenceError, InferenceFuture, InferenceGateway, InferenceRequest};
use crate::aws::{AwsCredentials, AwsJsonClient, BEDROCK_SIGNING_SERVICE, uri_encode};
use crate::config::ConfigError;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const INVOKE_MODEL_OPERATION: &str = "InvokeModel";

#[derive(Debug, Clone)]
pub struct BedrockRuntimeConfig {
    pub endpoint: String,
    pub region: String,
    pub model_id: String,
    pub credentials: Option<AwsCredentials>,
}

/// Invokes an Anthropic model hosted on Bedrock Runtime.
#[derive(Clone)]
pub struct BedrockRuntimeGateway {
    client: AwsJsonClient,
    invoke_url: Url,
    model_id: String,
}

impl BedrockRuntimeGateway {
    pub fn new(config: BedrockRuntimeConfig) -> Result<Self, ConfigError> {
        let invoke_url = Url::parse(&format!(
            "{}/model/{}/invoke",
            config.endpoint.trim_end_matches('/'),
            uri_encode(&config.model_id)
        ))
        .map_err(|err| {
            ConfigError::InvalidConfiguration(format!("invalid bedrock runtime endpoint: {err}"))
        })?;

        Ok(Self {
            client: AwsJsonClient::new(config.region, BEDROCK_SIGNING_SERVICE, config.credentials)?,
            invoke_url,
            model_id: config.model_id,
        })
    }
}

impl InferenceGateway for BedrockRuntimeGateway {
    fn invoke<'a>(&'a self, request: InferenceRequest) -> InferenceFuture<'a> {
        Box::pin(async move {
            let body = build_invoke_body(&request);
            let response = self
                .client
                .post_json(self.invoke_url.clone(), INVOKE_MODEL_OPERATION, &body)
                .await?;

            let text = first_text_block(&response).ok_or_else(|| {
                warn!(model = %self.model_id, "model response had no text content");
                InferenceError::MissingText
            })?;
            debug!(
                model = %self.model_id,
                message_count = request.messages.len(),
                response_chars = text.len(),
                "model invocation succeeded"
            );
            Ok(text)
        })
    }
}

/// Anthropic Messages body as accepted by Bedrock `InvokeModel`.
pub fn build_invoke_body(request: &InferenceRequest) -> Value {
    let mut body = json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "messages": request.messages,
    });

    if let Some(system) = request.system.as_deref().filter(|system| !system.is_empty()) {
        body["system"] = Value::String(system.to_string());
    }

    body
}

fn first_text_block(response: &Value) -> Option<String> {
    response
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| blocks.first())
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}
