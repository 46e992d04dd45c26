use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::config::{ConfigError, WeatherConfig};
use crate::models::WeatherSnapshot;

/// Why a lookup produced no snapshot. The display text is what callers see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherLookupError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Could not parse weather data.")]
    Unparseable,
}

/// Current conditions from a wttr.in-compatible JSON endpoint.
#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: Url,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            ConfigError::InvalidConfiguration(format!("invalid weather base url: {err}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidConfiguration(
                "weather base url cannot carry a path".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub async fn current(&self, location: &str) -> Result<WeatherSnapshot, WeatherLookupError> {
        let url = self.lookup_url(location);

        let response = self.http.get(url).send().await.map_err(|err| {
            warn!(error = %err, "weather request failed");
            WeatherLookupError::RequestFailed(err.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "weather upstream returned an error status");
            return Err(WeatherLookupError::RequestFailed(format!(
                "upstream returned status {status}"
            )));
        }

        let body = response.json::<Value>().await.map_err(|err| {
            warn!(error = %err, "weather response was not json");
            WeatherLookupError::RequestFailed(err.to_string())
        })?;

        parse_current_conditions(&body).ok_or(WeatherLookupError::Unparseable)
    }

    fn lookup_url(&self, location: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(location);
        }
        url.query_pairs_mut().append_pair("format", "j1");
        url
    }
}

/// Reads the first `current_condition` record of a `format=j1` payload.
pub fn parse_current_conditions(body: &Value) -> Option<WeatherSnapshot> {
    let current = body.get("current_condition")?.as_array()?.first()?;
    let description = current
        .get("weatherDesc")?
        .as_array()?
        .first()?
        .get("value")?;

    Some(WeatherSnapshot {
        temperature: scalar_text(current.get("temp_C")?)?,
        description: scalar_text(description)?,
        humidity: scalar_text(current.get("humidity")?)?,
        wind_speed: scalar_text(current.get("windspeedKmph")?)?,
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
