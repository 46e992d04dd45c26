use axum::Json;
use axum::extract::State;
use shared::models::{WeatherPayload, WeatherRequest, WeatherResponse};
use tracing::warn;

use super::AppState;
use super::extract::GatewayJson;

// Lookup failures are reported inside the payload, never as an error status.
pub(super) async fn weather(
    State(state): State<AppState>,
    GatewayJson(req): GatewayJson<WeatherRequest>,
) -> Json<WeatherResponse> {
    let result = state.assistant.weather(&req.location).await;
    if let Err(err) = &result {
        warn!(error = %err, "weather lookup returned no snapshot");
    }

    Json(WeatherResponse {
        weather: WeatherPayload::from(result),
        location: req.location,
    })
}
