use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::config::ConfigError;
use shared::models::{
    ChatRequest, ChatResponse, QueryRequest, RagResponse, WeatherRequest, WeatherResponse,
};
use thiserror::Error;
use tracing::debug;
use url::Url;

const CHAT_TIMEOUT: Duration = Duration::from_secs(60);
const RAG_TIMEOUT: Duration = Duration::from_secs(60);
const WEATHER_TIMEOUT: Duration = Duration::from_secs(30);

pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GatewayCallError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum GatewayCallError {
    #[error("{status} - {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Connection(String),
}

impl GatewayCallError {
    /// Non-success reply. A body that could not be read is named in the text
    /// so the transcript never shows a bare status.
    fn from_status<E: std::fmt::Display>(status: u16, body: Result<String, E>) -> Self {
        let body = body.unwrap_or_else(|err| format!("<unreadable body: {err}>"));
        Self::Status { status, body }
    }

    /// Transcript text for a failed call, e.g. `RAG Error: 500 - {...}`.
    pub fn describe(&self, kind: &str) -> String {
        let prefix = if kind.is_empty() {
            String::new()
        } else {
            format!("{kind} ")
        };

        match self {
            Self::Status { .. } => format!("{prefix}Error: {self}"),
            Self::Connection(_) => format!("{prefix}Connection Error: {self}"),
        }
    }
}

pub trait Gateway: Send + Sync {
    fn chat<'a>(&'a self, request: ChatRequest) -> GatewayFuture<'a, ChatResponse>;

    fn rag_query<'a>(&'a self, query: &'a str) -> GatewayFuture<'a, RagResponse>;

    fn weather<'a>(&'a self, location: &'a str) -> GatewayFuture<'a, WeatherResponse>;
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|err| {
            ConfigError::InvalidConfiguration(format!("gateway url {trimmed} is invalid: {err}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidConfiguration(format!(
                "gateway url {trimmed} must use http or https"
            )));
        }

        let http = Client::builder()
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self {
            http,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, timeout: Duration) -> Result<T, GatewayCallError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "calling gateway");

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| GatewayCallError::Connection(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await;
            return Err(GatewayCallError::from_status(status.as_u16(), body));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| GatewayCallError::Connection(err.to_string()))
    }
}

impl Gateway for GatewayClient {
    fn chat<'a>(&'a self, request: ChatRequest) -> GatewayFuture<'a, ChatResponse> {
        Box::pin(async move { self.post_json("/chat", &request, CHAT_TIMEOUT).await })
    }

    fn rag_query<'a>(&'a self, query: &'a str) -> GatewayFuture<'a, RagResponse> {
        Box::pin(async move {
            let body = QueryRequest {
                query: query.to_string(),
            };
            self.post_json("/kb-rag-query", &body, RAG_TIMEOUT).await
        })
    }

    fn weather<'a>(&'a self, location: &'a str) -> GatewayFuture<'a, WeatherResponse> {
        Box::pin(async move {
            let body = WeatherRequest {
                location: location.to_string(),
            };
            self.post_json("/weather", &body, WEATHER_TIMEOUT).await
        })
    }
}
