use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use shared::llm::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, InferenceRequest};
use shared::models::{ChatRequest, ChatResponse};
use tracing::info;

use super::AppState;
use super::errors::internal_error_response;
use super::extract::GatewayJson;

pub(super) async fn chat(
    State(state): State<AppState>,
    GatewayJson(req): GatewayJson<ChatRequest>,
) -> Response {
    let message_count = req.messages.len();
    let mut request = InferenceRequest::new(req.messages)
        .with_temperature(req.temperature.unwrap_or(DEFAULT_TEMPERATURE))
        .with_max_tokens(req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS));
    if let Some(system) = req.system {
        request = request.with_system(system);
    }

    match state.assistant.chat(request).await {
        Ok(response) => {
            info!(message_count, response_chars = response.len(), "chat completed");
            Json(ChatResponse { response }).into_response()
        }
        Err(err) => internal_error_response(format!("Error in chat: {err}")),
    }
}
