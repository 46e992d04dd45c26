use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use shared::models::{HealthResponse, RootResponse};

use super::AppState;
use super::errors::service_unavailable_response;

pub(super) async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Knowledge Base RAG API is running".to_string(),
    })
}

pub(super) async fn health(State(state): State<AppState>) -> Response {
    let health = &state.health;
    if !health.credentials_configured {
        return service_unavailable_response(
            "Service unhealthy: AWS credentials are not configured".to_string(),
        );
    }

    Json(HealthResponse {
        status: "healthy".to_string(),
        aws_region: health.aws_region.clone(),
        model: health.model.clone(),
        knowledge_base_id: health.knowledge_base_id.clone(),
    })
    .into_response()
}
