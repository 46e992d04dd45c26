use std::future::Future;
use std::pin::Pin;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::aws::{AwsCallError, AwsCredentials, AwsJsonClient, BEDROCK_SIGNING_SERVICE, uri_encode};
use crate::config::ConfigError;
use crate::models::RetrievalResult;

pub const DEFAULT_NUM_RESULTS: u32 = 3;

const RETRIEVE_OPERATION: &str = "Retrieve";

pub type RetrievalFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<RetrievalResult>, RetrievalError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Upstream(#[from] AwsCallError),
}

impl RetrievalError {
    /// True when the retrieval service itself rejected the request.
    pub fn is_service_error(&self) -> bool {
        match self {
            Self::Upstream(err) => err.is_service_error(),
        }
    }
}

/// Vector search over one managed knowledge base.
pub trait KnowledgeBase: Send + Sync {
    fn knowledge_base_id(&self) -> &str;

    fn retrieve<'a>(&'a self, query: &'a str, num_results: u32) -> RetrievalFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct BedrockKnowledgeBaseConfig {
    pub endpoint: String,
    pub region: String,
    pub knowledge_base_id: String,
    pub credentials: Option<AwsCredentials>,
}

#[derive(Clone)]
pub struct BedrockKnowledgeBase {
    client: AwsJsonClient,
    retrieve_url: Url,
    knowledge_base_id: String,
}

impl BedrockKnowledgeBase {
    pub fn new(config: BedrockKnowledgeBaseConfig) -> Result<Self, ConfigError> {
        let retrieve_url = Url::parse(&format!(
            "{}/knowledgebases/{}/retrieve",
            config.endpoint.trim_end_matches('/'),
            uri_encode(&config.knowledge_base_id)
        ))
        .map_err(|err| {
            ConfigError::InvalidConfiguration(format!(
                "invalid bedrock agent runtime endpoint: {err}"
            ))
        })?;

        Ok(Self {
            client: AwsJsonClient::new(config.region, BEDROCK_SIGNING_SERVICE, config.credentials)?,
            retrieve_url,
            knowledge_base_id: config.knowledge_base_id,
        })
    }
}

impl KnowledgeBase for BedrockKnowledgeBase {
    fn knowledge_base_id(&self) -> &str {
        &self.knowledge_base_id
    }

    fn retrieve<'a>(&'a self, query: &'a str, num_results: u32) -> RetrievalFuture<'a> {
        Box::pin(async move {
            let body = build_retrieve_body(query, num_results);
            let response = self
                .client
                .post_json(self.retrieve_url.clone(), RETRIEVE_OPERATION, &body)
                .await?;

            let results = parse_retrieval_results(&response);
            debug!(
                knowledge_base_id = %self.knowledge_base_id,
                requested = num_results,
                returned = results.len(),
                "knowledge base retrieval succeeded"
            );
            Ok(results)
        })
    }
}

pub fn build_retrieve_body(query: &str, num_results: u32) -> Value {
    json!({
        "retrievalQuery": { "text": query },
        "retrievalConfiguration": {
            "vectorSearchConfiguration": {
                "numberOfResults": num_results
            }
        }
    })
}

/// Maps `retrievalResults` in upstream order; absent fields become empty values.
pub fn parse_retrieval_results(response: &Value) -> Vec<RetrievalResult> {
    let Some(results) = response.get("retrievalResults").and_then(Value::as_array) else {
        return Vec::new();
    };

    results
        .iter()
        .map(|result| RetrievalResult {
            content: result
                .get("content")
                .and_then(|content| content.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            score: result.get("score").and_then(Value::as_f64).unwrap_or(0.0),
            metadata: result
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        })
        .collect()
}
