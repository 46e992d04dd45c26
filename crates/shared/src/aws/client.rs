use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use url::Url;

use super::AwsCredentials;
use super::sigv4::{AMZ_DATE_HEADER, SECURITY_TOKEN_HEADER, SigningParams, sign_request};
use crate::config::ConfigError;

const JSON_CONTENT_TYPE: &str = "application/json";
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

#[derive(Debug, Error)]
pub enum AwsCallError {
    #[error("Unable to locate credentials")]
    MissingCredentials,
    #[error("request to {url} failed: {detail}")]
    Transport { url: String, detail: String },
    #[error("An error occurred ({error_type}) when calling the {operation} operation: {message}")]
    Service {
        status: u16,
        error_type: String,
        operation: &'static str,
        message: String,
    },
    #[error("invalid {operation} response payload: {detail}")]
    InvalidPayload {
        operation: &'static str,
        detail: String,
    },
}

impl AwsCallError {
    /// True when the remote service answered with an error status.
    pub fn is_service_error(&self) -> bool {
        matches!(self, Self::Service { .. })
    }
}

/// Sends SigV4-signed JSON requests to one AWS service in one region.
#[derive(Clone)]
pub struct AwsJsonClient {
    http: reqwest::Client,
    region: String,
    service: &'static str,
    credentials: Option<AwsCredentials>,
}

impl AwsJsonClient {
    pub fn new(
        region: impl Into<String>,
        service: &'static str,
        credentials: Option<AwsCredentials>,
    ) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self {
            http,
            region: region.into(),
            service,
            credentials,
        })
    }

    pub async fn post_json(
        &self,
        url: Url,
        operation: &'static str,
        body: &Value,
    ) -> Result<Value, AwsCallError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(AwsCallError::MissingCredentials)?;
        let payload = serde_json::to_vec(body).map_err(|err| AwsCallError::InvalidPayload {
            operation,
            detail: err.to_string(),
        })?;

        let signed = sign_request(
            "POST",
            &url,
            &[("content-type", JSON_CONTENT_TYPE)],
            &payload,
            SigningParams {
                credentials,
                region: &self.region,
                service: self.service,
                timestamp: Utc::now(),
            },
        );

        let mut request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .header(AMZ_DATE_HEADER, &signed.amz_date)
            .header(AUTHORIZATION, &signed.authorization);
        if let Some(token) = signed.security_token.as_deref() {
            request = request.header(SECURITY_TOKEN_HEADER, token);
        }

        let response = request.body(payload).send().await.map_err(|err| {
            warn!(operation, error = %err, "aws request failed before a response");
            AwsCallError::Transport {
                url: url.to_string(),
                detail: err.to_string(),
            }
        })?;

        let status = response.status();
        let error_type = header_error_type(response.headers());
        let body = response
            .text()
            .await
            .map_err(|err| AwsCallError::InvalidPayload {
                operation,
                detail: format!("response body read failed: {err}"),
            })?;

        if !status.is_success() {
            let (body_type, message) = parse_service_error(&body);
            let error_type = error_type
                .or(body_type)
                .unwrap_or_else(|| "UnknownError".to_string());
            warn!(
                operation,
                status = status.as_u16(),
                error_type = %error_type,
                "aws service returned an error"
            );
            return Err(AwsCallError::Service {
                status: status.as_u16(),
                error_type,
                operation,
                message,
            });
        }

        serde_json::from_str(&body).map_err(|err| AwsCallError::InvalidPayload {
            operation,
            detail: err.to_string(),
        })
    }
}

// Header values look like `ValidationException:http://internal.amazon.com/...`.
fn header_error_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ERROR_TYPE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(':').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn parse_service_error(body: &str) -> (Option<String>, String) {
    #[derive(Deserialize)]
    struct ServiceErrorEnvelope {
        #[serde(alias = "Message")]
        message: Option<String>,
        #[serde(rename = "__type")]
        error_type: Option<String>,
    }

    match serde_json::from_str::<ServiceErrorEnvelope>(body) {
        Ok(envelope) => {
            let error_type = envelope
                .error_type
                .map(|value| value.rsplit('#').next().unwrap_or_default().to_string())
                .filter(|value| !value.is_empty());
            let message = envelope.message.unwrap_or_else(|| body.to_string());
            (error_type, message)
        }
        Err(_) => (None, body.trim().to_string()),
    }
}
