use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use shared::aws::AwsCallError;
use shared::knowledge_base::{KnowledgeBase, RetrievalError, RetrievalFuture};
use shared::llm::{InferenceError, InferenceFuture, InferenceGateway, InferenceRequest};
use shared::models::RetrievalResult;
use tokio::sync::oneshot;

use super::serve_router;

pub enum InferenceBehavior {
    Reply(String),
    Throttled,
    Unreachable,
}

pub struct FakeInference {
    behavior: InferenceBehavior,
    seen: Mutex<Vec<InferenceRequest>>,
}

impl FakeInference {
    pub fn replying(text: &str) -> Self {
        Self::with_behavior(InferenceBehavior::Reply(text.to_string()))
    }

    pub fn with_behavior(behavior: InferenceBehavior) -> Self {
        Self {
            behavior,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.seen
            .lock()
            .expect("inference log lock should not be poisoned")
            .clone()
    }
}

impl InferenceGateway for FakeInference {
    fn invoke<'a>(&'a self, request: InferenceRequest) -> InferenceFuture<'a> {
        Box::pin(async move {
            self.seen
                .lock()
                .expect("inference log lock should not be poisoned")
                .push(request);

            match &self.behavior {
                InferenceBehavior::Reply(text) => Ok(text.clone()),
                InferenceBehavior::Throttled => Err(InferenceError::Upstream(AwsCallError::Service {
                    status: 429,
                    error_type: "ThrottlingException".to_string(),
                    operation: "InvokeModel",
                    message: "Too many requests, please wait before trying again.".to_string(),
                })),
                InferenceBehavior::Unreachable => Err(InferenceError::Upstream(
                    AwsCallError::Transport {
                        url: "https://bedrock-runtime.us-east-1.amazonaws.com".to_string(),
                        detail: "connection refused".to_string(),
                    },
                )),
            }
        })
    }
}

pub enum RetrievalBehavior {
    Documents(Vec<RetrievalResult>),
    Rejected,
    Unreachable,
}

pub struct FakeKnowledgeBase {
    behavior: RetrievalBehavior,
    seen: Mutex<Vec<(String, u32)>>,
}

impl FakeKnowledgeBase {
    pub fn with_documents(documents: Vec<RetrievalResult>) -> Self {
        Self::with_behavior(RetrievalBehavior::Documents(documents))
    }

    pub fn with_behavior(behavior: RetrievalBehavior) -> Self {
        Self {
            behavior,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.seen
            .lock()
            .expect("retrieval log lock should not be poisoned")
            .clone()
    }
}

impl KnowledgeBase for FakeKnowledgeBase {
    fn knowledge_base_id(&self) -> &str {
        super::TEST_KNOWLEDGE_BASE_ID
    }

    fn retrieve<'a>(&'a self, query: &'a str, num_results: u32) -> RetrievalFuture<'a> {
        Box::pin(async move {
            self.seen
                .lock()
                .expect("retrieval log lock should not be poisoned")
                .push((query.to_string(), num_results));

            match &self.behavior {
                RetrievalBehavior::Documents(documents) => Ok(documents
                    .iter()
                    .take(num_results as usize)
                    .cloned()
                    .collect()),
                RetrievalBehavior::Rejected => Err(RetrievalError::Upstream(AwsCallError::Service {
                    status: 400,
                    error_type: "ValidationException".to_string(),
                    operation: "Retrieve",
                    message: "Knowledge base KBTEST1234 does not exist".to_string(),
                })),
                RetrievalBehavior::Unreachable => {
                    Err(RetrievalError::Upstream(AwsCallError::MissingCredentials))
                }
            }
        })
    }
}

pub fn document(content: &str, score: f64, source_uri: &str) -> RetrievalResult {
    let mut metadata = Map::new();
    metadata.insert(
        "x-amz-bedrock-kb-source-uri".to_string(),
        json!(source_uri),
    );
    RetrievalResult {
        content: content.to_string(),
        score,
        metadata,
    }
}

pub fn policy_documents() -> Vec<RetrievalResult> {
    vec![
        document(
            "Refunds are issued to the original payment method within 14 days.",
            0.87,
            "s3://kb/refunds.md",
        ),
        document("Store credit never expires.", 0.61, "s3://kb/credit.md"),
        document("Gift cards are non-refundable.", 0.44, "s3://kb/gift-cards.md"),
        document("Shipping is free for orders over $50.", 0.12, "s3://kb/shipping.md"),
    ]
}

#[derive(Clone)]
pub enum WeatherReply {
    Json(Value),
    Status(StatusCode),
}

#[derive(Clone)]
struct WeatherUpstreamState {
    reply: WeatherReply,
    seen: Arc<Mutex<Vec<String>>>,
}

pub struct WeatherUpstream {
    pub base_url: String,
    seen: Arc<Mutex<Vec<String>>>,
    shutdown_tx: oneshot::Sender<()>,
    server_task: tokio::task::JoinHandle<()>,
}

impl WeatherUpstream {
    pub async fn start(reply: WeatherReply) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/{location}", get(weather_handler))
            .with_state(WeatherUpstreamState {
                reply,
                seen: seen.clone(),
            });
        let (base_url, shutdown_tx, server_task) = serve_router(app).await;

        Self {
            base_url,
            seen,
            shutdown_tx,
            server_task,
        }
    }

    pub fn locations(&self) -> Vec<String> {
        self.seen.lock().expect("weather log lock").clone()
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        self.server_task.await.expect("weather upstream should join");
    }
}

async fn weather_handler(
    State(state): State<WeatherUpstreamState>,
    Path(location): Path<String>,
) -> Response {
    state.seen.lock().expect("weather log lock").push(location);

    match state.reply {
        WeatherReply::Json(body) => (StatusCode::OK, Json(body)).into_response(),
        WeatherReply::Status(status) => (status, "upstream unavailable").into_response(),
    }
}

pub fn wttr_payload(temp_c: &str, description: &str, humidity: &str, wind_kmph: &str) -> Value {
    json!({
        "current_condition": [
            {
                "temp_C": temp_c,
                "humidity": humidity,
                "weatherDesc": [{ "value": description }],
                "windspeedKmph": wind_kmph
            }
        ]
    })
}

pub fn unexpected_weather_payload() -> Value {
    json!({ "current_condition": [], "weather": Value::Null })
}
