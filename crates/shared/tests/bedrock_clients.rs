use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header::AUTHORIZATION};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::aws::{AwsCallError, AwsCredentials};
use shared::knowledge_base::{
    BedrockKnowledgeBase, BedrockKnowledgeBaseConfig, KnowledgeBase, RetrievalError,
};
use shared::llm::{
    BedrockRuntimeConfig, BedrockRuntimeGateway, InferenceError, InferenceGateway,
    InferenceRequest,
};
use shared::models::ChatMessage;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

const MODEL_ID: &str = "us.anthropic.claude-3-7-sonnet-20250219-v1:0";
const KNOWLEDGE_BASE_ID: &str = "KBTEST0001";

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
    error_type: Option<&'static str>,
}

impl MockReply {
    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            error_type: None,
        }
    }
}

#[derive(Debug, Clone)]
struct SeenRequest {
    path: String,
    body: Value,
    authorization: Option<String>,
    amz_date: Option<String>,
    security_token: Option<String>,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn invoke_model_sends_signed_anthropic_body_and_returns_first_text() {
    let state = TestServerState::with_replies(vec![MockReply::ok(json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [
            { "type": "text", "text": "Hello there!" },
            { "type": "text", "text": "ignored" }
        ]
    }))]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = runtime_gateway(&base_url, Some(test_credentials(None)));
    let text = gateway
        .invoke(
            InferenceRequest::new(vec![ChatMessage::user("Hello")])
                .with_system("Be kind.")
                .with_temperature(0.7)
                .with_max_tokens(300),
        )
        .await
        .expect("invocation should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(text, "Hello there!");

    let seen = state.seen.lock().await.clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].path,
        "/model/us.anthropic.claude-3-7-sonnet-20250219-v1%3A0/invoke"
    );
    assert_eq!(seen[0].body["anthropic_version"], "bedrock-2023-05-31");
    assert_eq!(seen[0].body["system"], "Be kind.");
    assert_eq!(seen[0].body["temperature"], 0.7);
    assert_eq!(seen[0].body["max_tokens"], 300);
    assert_eq!(
        seen[0].body["messages"],
        json!([{ "role": "user", "content": "Hello" }])
    );

    let authorization = seen[0]
        .authorization
        .as_deref()
        .expect("request should be signed");
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDTEST/"));
    assert!(authorization.contains("/us-east-1/bedrock/aws4_request"));
    assert!(authorization.contains("SignedHeaders=content-type;host;x-amz-date,"));
    assert!(seen[0].amz_date.is_some());
    assert!(seen[0].security_token.is_none());
}

#[tokio::test]
async fn session_token_is_forwarded() {
    let state = TestServerState::with_replies(vec![MockReply::ok(json!({
        "content": [{ "type": "text", "text": "ok" }]
    }))]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = runtime_gateway(&base_url, Some(test_credentials(Some("temp-token"))));
    gateway
        .invoke(InferenceRequest::new(vec![ChatMessage::user("Hi")]))
        .await
        .expect("invocation should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    let seen = state.seen.lock().await.clone();
    assert_eq!(seen[0].security_token.as_deref(), Some("temp-token"));
    assert!(
        seen[0]
            .authorization
            .as_deref()
            .unwrap_or_default()
            .contains("x-amz-security-token")
    );
}

#[tokio::test]
async fn service_error_carries_type_and_message_without_retry() {
    let state = TestServerState::with_replies(vec![
        MockReply {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: json!({ "message": "Too many requests, please wait before trying again." }),
            error_type: Some("ThrottlingException:http://internal.amazon.com/coral/"),
        },
        MockReply::ok(json!({ "content": [{ "type": "text", "text": "too late" }] })),
    ]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = runtime_gateway(&base_url, Some(test_credentials(None)));
    let err = gateway
        .invoke(InferenceRequest::new(vec![ChatMessage::user("Hello")]))
        .await
        .expect_err("throttling should surface as an error");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(
            err,
            InferenceError::Upstream(AwsCallError::Service { status: 429, .. })
        ),
        "expected a service error, got {err:?}"
    );
    assert_eq!(
        err.to_string(),
        "An error occurred (ThrottlingException) when calling the InvokeModel operation: \
         Too many requests, please wait before trying again."
    );
    assert_eq!(state.seen.lock().await.len(), 1);
}

#[tokio::test]
async fn response_without_text_block_is_rejected() {
    let state = TestServerState::with_replies(vec![MockReply::ok(json!({ "content": [] }))]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let gateway = runtime_gateway(&base_url, Some(test_credentials(None)));
    let err = gateway
        .invoke(InferenceRequest::new(vec![ChatMessage::user("Hello")]))
        .await
        .expect_err("empty content should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(err, InferenceError::MissingText));
}

#[tokio::test]
async fn missing_credentials_fail_before_any_request() {
    let state = TestServerState::with_replies(Vec::new());
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = runtime_gateway(&base_url, None);
    let err = gateway
        .invoke(InferenceRequest::new(vec![ChatMessage::user("Hello")]))
        .await
        .expect_err("unsigned requests should not be sent");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(
        err,
        InferenceError::Upstream(AwsCallError::MissingCredentials)
    ));
    assert!(state.seen.lock().await.is_empty());
}

#[tokio::test]
async fn unreachable_runtime_is_a_transport_error() {
    let gateway = runtime_gateway(&closed_port_url().await, Some(test_credentials(None)));
    let err = gateway
        .invoke(InferenceRequest::new(vec![ChatMessage::user("Hello")]))
        .await
        .expect_err("closed port should fail");

    assert!(matches!(
        err,
        InferenceError::Upstream(AwsCallError::Transport { .. })
    ));
}

#[tokio::test]
async fn retrieve_sends_vector_search_request_and_defaults_missing_fields() {
    let state = TestServerState::with_replies(vec![MockReply::ok(json!({
        "retrievalResults": [
            {
                "content": { "text": "Refunds are issued within 14 days." },
                "score": 0.83,
                "metadata": { "x-amz-bedrock-kb-source-uri": "s3://docs/refunds.md" },
                "location": { "type": "S3" }
            },
            { "content": { "text": "Contact support for exceptions." } }
        ]
    }))]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let knowledge_base = knowledge_base(&base_url, Some(test_credentials(None)));
    let results = knowledge_base
        .retrieve("refund policy", 2)
        .await
        .expect("retrieval should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].content, "Refunds are issued within 14 days.");
    assert_eq!(results[0].score, 0.83);
    assert_eq!(
        results[0].metadata["x-amz-bedrock-kb-source-uri"],
        "s3://docs/refunds.md"
    );
    assert_eq!(results[1].score, 0.0);
    assert!(results[1].metadata.is_empty());

    let seen = state.seen.lock().await.clone();
    assert_eq!(seen[0].path, "/knowledgebases/KBTEST0001/retrieve");
    assert_eq!(seen[0].body["retrievalQuery"]["text"], "refund policy");
    assert_eq!(
        seen[0].body["retrievalConfiguration"]["vectorSearchConfiguration"]["numberOfResults"],
        2
    );
    assert!(
        seen[0]
            .authorization
            .as_deref()
            .unwrap_or_default()
            .contains("/bedrock/aws4_request")
    );
}

#[tokio::test]
async fn retrieve_service_errors_are_flagged() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::NOT_FOUND,
        body: json!({ "message": "Knowledge base KBTEST0001 does not exist" }),
        error_type: Some("ResourceNotFoundException"),
    }]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let knowledge_base = knowledge_base(&base_url, Some(test_credentials(None)));
    let err = knowledge_base
        .retrieve("anything", 3)
        .await
        .expect_err("missing knowledge base should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(err.is_service_error());
    assert!(matches!(
        err,
        RetrievalError::Upstream(AwsCallError::Service { status: 404, .. })
    ));
    assert!(err.to_string().contains("(ResourceNotFoundException)"));
    assert!(err.to_string().contains("Retrieve operation"));
}

#[tokio::test]
async fn retrieve_non_object_payload_yields_no_results() {
    let state = TestServerState::with_replies(vec![MockReply::ok(Value::String(
        "not an object".to_string(),
    ))]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let knowledge_base = knowledge_base(&base_url, Some(test_credentials(None)));
    let results = knowledge_base
        .retrieve("anything", 3)
        .await
        .expect("a payload without retrievalResults is an empty result set");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(results.is_empty());
}

fn test_credentials(session_token: Option<&str>) -> AwsCredentials {
    AwsCredentials {
        access_key_id: "AKIDTEST".to_string(),
        secret_access_key: "test-secret-key".to_string(),
        session_token: session_token.map(ToString::to_string),
    }
}

fn runtime_gateway(base_url: &str, credentials: Option<AwsCredentials>) -> BedrockRuntimeGateway {
    BedrockRuntimeGateway::new(BedrockRuntimeConfig {
        endpoint: base_url.to_string(),
        region: "us-east-1".to_string(),
        model_id: MODEL_ID.to_string(),
        credentials,
    })
    .expect("runtime gateway should build")
}

fn knowledge_base(base_url: &str, credentials: Option<AwsCredentials>) -> BedrockKnowledgeBase {
    BedrockKnowledgeBase::new(BedrockKnowledgeBaseConfig {
        endpoint: base_url.to_string(),
        region: "us-east-1".to_string(),
        knowledge_base_id: KNOWLEDGE_BASE_ID.to_string(),
        credentials,
    })
    .expect("knowledge base client should build")
}

async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    drop(listener);
    format!("http://{local_addr}")
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/model/{model_id}/invoke", post(test_handler))
        .route("/knowledgebases/{knowledge_base_id}/retrieve", post(test_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (format!("http://{local_addr}"), shutdown_tx, server_task)
}

async fn test_handler(
    State(state): State<TestServerState>,
    uri: Uri,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, HeaderMap, Json<Value>) {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    };

    state.seen.lock().await.push(SeenRequest {
        path: uri.path().to_string(),
        body: payload,
        authorization: header_text(AUTHORIZATION.as_str()),
        amz_date: header_text("x-amz-date"),
        security_token: header_text("x-amz-security-token"),
    });

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({ "message": "exhausted test replies" }),
        error_type: Some("InternalServerException"),
    });

    let mut response_headers = HeaderMap::new();
    if let Some(error_type) = reply.error_type {
        response_headers.insert(
            "x-amzn-errortype",
            error_type.parse().expect("error type header should parse"),
        );
    }

    (reply.status, response_headers, Json(reply.body))
}
