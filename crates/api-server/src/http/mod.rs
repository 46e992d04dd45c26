use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::assistant::AssistantService;
use shared::config::GatewayConfig;

mod chat;
mod errors;
mod extract;
mod health;
mod knowledge_base;
mod observability;
mod weather;

#[derive(Clone)]
pub struct AppState {
    pub assistant: AssistantService,
    pub health: HealthInfo,
}

/// Static facts reported by `/health`.
#[derive(Debug, Clone)]
pub struct HealthInfo {
    pub aws_region: String,
    pub model: String,
    pub knowledge_base_id: String,
    pub credentials_configured: bool,
}

impl HealthInfo {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            aws_region: config.aws_region.clone(),
            model: config.model_id.clone(),
            knowledge_base_id: config.knowledge_base_id.clone(),
            credentials_configured: config.credentials.is_some(),
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .route("/kb-retrieve", post(knowledge_base::kb_retrieve))
        .route("/kb-rag-query", post(knowledge_base::kb_rag_query))
        .route("/weather", post(weather::weather))
        .layer(middleware::from_fn(observability::gateway_access_log))
        .with_state(app_state)
}
