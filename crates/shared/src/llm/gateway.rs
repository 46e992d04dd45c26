use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::aws::AwsCallError;
use crate::models::ChatMessage;

pub const DEFAULT_TEMPERATURE: f64 = 0.5;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

pub type InferenceFuture<'a> = Pin<Box<dyn Future<Output = Result<String, InferenceError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl InferenceRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            system: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_system(mut self, system: impl AsRef<str>) -> Self {
        let system = system.as_ref();
        if !system.is_empty() {
            self.system = Some(system.to_string());
        }
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Upstream(#[from] AwsCallError),
    #[error("model response did not contain a text block")]
    MissingText,
}

/// Remote model inference: one conversation in, the first generated text block out.
pub trait InferenceGateway: Send + Sync {
    fn invoke<'a>(&'a self, request: InferenceRequest) -> InferenceFuture<'a>;
}
