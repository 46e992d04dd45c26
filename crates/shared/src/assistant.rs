use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, GatewayConfig};
use crate::knowledge_base::{
    BedrockKnowledgeBase, BedrockKnowledgeBaseConfig, KnowledgeBase, RetrievalError,
};
use crate::llm::{
    BedrockRuntimeConfig, BedrockRuntimeGateway, InferenceError, InferenceGateway,
    InferenceRequest, RAG_SYSTEM_PROMPT, build_context_block, build_rag_user_prompt,
};
use crate::models::{ChatMessage, RetrievalResult, WeatherSnapshot};
use crate::weather::{WeatherClient, WeatherLookupError};

pub const RAG_NUM_RESULTS: u32 = 3;
pub const RAG_TEMPERATURE: f64 = 0.3;
pub const RAG_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Error invoking model: {0}")]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<RetrievalResult>,
    pub query: String,
}

/// The gateway operations, over explicitly injected upstream clients.
#[derive(Clone)]
pub struct AssistantService {
    inference: Arc<dyn InferenceGateway>,
    knowledge_base: Arc<dyn KnowledgeBase>,
    weather: WeatherClient,
}

impl AssistantService {
    pub fn new(
        inference: Arc<dyn InferenceGateway>,
        knowledge_base: Arc<dyn KnowledgeBase>,
        weather: WeatherClient,
    ) -> Self {
        Self {
            inference,
            knowledge_base,
            weather,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let inference = BedrockRuntimeGateway::new(BedrockRuntimeConfig {
            endpoint: config.runtime_endpoint.clone(),
            region: config.aws_region.clone(),
            model_id: config.model_id.clone(),
            credentials: config.credentials.clone(),
        })?;
        let knowledge_base = BedrockKnowledgeBase::new(BedrockKnowledgeBaseConfig {
            endpoint: config.agent_runtime_endpoint.clone(),
            region: config.aws_region.clone(),
            knowledge_base_id: config.knowledge_base_id.clone(),
            credentials: config.credentials.clone(),
        })?;
        let weather = WeatherClient::new(&config.weather)?;

        Ok(Self::new(
            Arc::new(inference),
            Arc::new(knowledge_base),
            weather,
        ))
    }

    pub async fn chat(&self, request: InferenceRequest) -> Result<String, AssistantError> {
        Ok(self.inference.invoke(request).await?)
    }

    pub async fn retrieve(
        &self,
        query: &str,
        num_results: u32,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        self.knowledge_base.retrieve(query, num_results).await
    }

    /// Retrieves context for `query`, then answers from that context only.
    pub async fn rag_query(&self, query: &str) -> Result<RagAnswer, AssistantError> {
        let sources = self.retrieve(query, RAG_NUM_RESULTS).await?;
        let context_block = build_context_block(&sources);

        let request = InferenceRequest::new(vec![ChatMessage::user(build_rag_user_prompt(
            &context_block,
            query,
        ))])
        .with_system(RAG_SYSTEM_PROMPT)
        .with_temperature(RAG_TEMPERATURE)
        .with_max_tokens(RAG_MAX_TOKENS);

        let answer = self.chat(request).await?;
        info!(
            knowledge_base_id = %self.knowledge_base.knowledge_base_id(),
            source_count = sources.len(),
            "rag answer generated"
        );

        Ok(RagAnswer {
            answer,
            sources,
            query: query.to_string(),
        })
    }

    pub async fn weather(&self, location: &str) -> Result<WeatherSnapshot, WeatherLookupError> {
        self.weather.current(location).await
    }
}
