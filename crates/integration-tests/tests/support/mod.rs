#![allow(dead_code)]

pub mod upstreams;

use std::sync::Arc;
use std::time::Duration;

use api_server::http::{AppState, HealthInfo, build_router};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use shared::assistant::AssistantService;
use shared::config::WeatherConfig;
use shared::weather::WeatherClient;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;

use upstreams::{FakeInference, FakeKnowledgeBase};

pub const TEST_MODEL_ID: &str = "us.anthropic.claude-3-7-sonnet-20250219-v1:0";
pub const TEST_KNOWLEDGE_BASE_ID: &str = "KBTEST1234";
pub const TEST_REGION: &str = "us-east-1";

pub struct TestGateway {
    pub router: Router,
    pub inference: Arc<FakeInference>,
    pub knowledge_base: Arc<FakeKnowledgeBase>,
}

pub struct JsonResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

pub fn build_test_gateway(
    inference: FakeInference,
    knowledge_base: FakeKnowledgeBase,
    weather_base_url: &str,
) -> TestGateway {
    build_test_gateway_with_health(inference, knowledge_base, weather_base_url, true)
}

pub fn build_test_gateway_with_health(
    inference: FakeInference,
    knowledge_base: FakeKnowledgeBase,
    weather_base_url: &str,
    credentials_configured: bool,
) -> TestGateway {
    let inference = Arc::new(inference);
    let knowledge_base = Arc::new(knowledge_base);
    let weather = WeatherClient::new(&WeatherConfig {
        base_url: weather_base_url.to_string(),
        timeout: Duration::from_secs(5),
    })
    .expect("weather client should initialize");

    let router = build_router(AppState {
        assistant: AssistantService::new(inference.clone(), knowledge_base.clone(), weather),
        health: HealthInfo {
            aws_region: TEST_REGION.to_string(),
            model: TEST_MODEL_ID.to_string(),
            knowledge_base_id: TEST_KNOWLEDGE_BASE_ID.to_string(),
            credentials_configured,
        },
    });

    TestGateway {
        router,
        inference,
        knowledge_base,
    }
}

/// Serves `router` on an ephemeral port until the returned sender fires.
pub async fn serve_router(
    router: Router,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (format!("http://{local_addr}"), shutdown_tx, server_task)
}

/// An address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    drop(listener);
    format!("http://{local_addr}")
}

pub async fn send_json(app: &Router, request: Request<Body>) -> JsonResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");
    let body = serde_json::from_slice::<Value>(&body).unwrap_or_else(|_| json!({}));

    JsonResponse {
        status,
        headers,
        body,
    }
}

pub fn request(method: Method, uri: &str, json_body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    match json_body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    }
}

pub fn detail(body: &Value) -> &str {
    body.get("detail")
        .and_then(Value::as_str)
        .expect("error body should carry a detail string")
}
