use std::time::Duration;

use thiserror::Error;

use crate::aws::AwsCredentials;
use crate::config_env::{optional_trimmed_env, parse_endpoint_env, parse_u64_env, require_env};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_AWS_REGION: &str = "us-east-1";
const DEFAULT_MODEL_ID: &str = "us.anthropic.claude-3-7-sonnet-20250219-v1:0";
const DEFAULT_WEATHER_BASE_URL: &str = "https://wttr.in";
const DEFAULT_WEATHER_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub aws_region: String,
    pub credentials: Option<AwsCredentials>,
    pub model_id: String,
    pub knowledge_base_id: String,
    pub runtime_endpoint: String,
    pub agent_runtime_endpoint: String,
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_WEATHER_TIMEOUT_SECONDS),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let aws_region = optional_trimmed_env("AWS_DEFAULT_REGION")
            .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());

        let runtime_endpoint = parse_endpoint_env(
            "BEDROCK_RUNTIME_ENDPOINT",
            format!("https://bedrock-runtime.{aws_region}.amazonaws.com"),
        )?;
        let agent_runtime_endpoint = parse_endpoint_env(
            "BEDROCK_AGENT_RUNTIME_ENDPOINT",
            format!("https://bedrock-agent-runtime.{aws_region}.amazonaws.com"),
        )?;

        Ok(Self {
            bind_addr: optional_trimmed_env("API_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            credentials: credentials_from_env()?,
            model_id: optional_trimmed_env("BEDROCK_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            knowledge_base_id: require_env("KNOWLEDGE_BASE_ID")?,
            runtime_endpoint,
            agent_runtime_endpoint,
            weather: WeatherConfig {
                base_url: parse_endpoint_env(
                    "WEATHER_BASE_URL",
                    DEFAULT_WEATHER_BASE_URL.to_string(),
                )?,
                timeout: Duration::from_secs(parse_u64_env(
                    "WEATHER_TIMEOUT_SECONDS",
                    DEFAULT_WEATHER_TIMEOUT_SECONDS,
                )?),
            },
            aws_region,
        })
    }
}

/// Loads `.env` from the working directory if one exists.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}

fn credentials_from_env() -> Result<Option<AwsCredentials>, ConfigError> {
    let access_key_id = optional_trimmed_env("AWS_ACCESS_KEY_ID");
    let secret_access_key = optional_trimmed_env("AWS_SECRET_ACCESS_KEY");

    match (access_key_id, secret_access_key) {
        (Some(access_key_id), Some(secret_access_key)) => Ok(Some(AwsCredentials {
            access_key_id,
            secret_access_key,
            session_token: optional_trimmed_env("AWS_SESSION_TOKEN"),
        })),
        (None, None) => Ok(None),
        _ => Err(ConfigError::InvalidConfiguration(
            "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together".to_string(),
        )),
    }
}
