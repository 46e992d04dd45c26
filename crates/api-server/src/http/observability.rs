use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::FailureDetail;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Gateway endpoint a request was routed to, as it appears in the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatewayOperation {
    Root,
    Health,
    Chat,
    KbRetrieve,
    KbRagQuery,
    Weather,
    Unrouted,
}

impl GatewayOperation {
    fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "" => Self::Root,
            "/health" => Self::Health,
            "/chat" => Self::Chat,
            "/kb-retrieve" => Self::KbRetrieve,
            "/kb-rag-query" => Self::KbRagQuery,
            "/weather" => Self::Weather,
            _ => Self::Unrouted,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Health => "health",
            Self::Chat => "chat",
            Self::KbRetrieve => "kb_retrieve",
            Self::KbRagQuery => "kb_rag_query",
            Self::Weather => "weather",
            Self::Unrouted => "unrouted",
        }
    }
}

/// Correlation id echoed on every response. A caller-supplied id is reused
/// when it is a short printable token; anything else is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestId(String);

impl RequestId {
    const MAX_LEN: usize = 64;

    fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(Self::accept)
            .unwrap_or_else(Self::generate)
    }

    fn accept(candidate: &str) -> Option<Self> {
        let candidate = candidate.trim();
        let printable_token = candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
        (!candidate.is_empty() && candidate.len() <= Self::MAX_LEN && printable_token)
            .then(|| Self(candidate.to_string()))
    }

    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Leading part of a `{detail}` message, e.g. `AWS Bedrock error` or
/// `Error in chat`. Groups failures without the upstream text.
fn failure_class(detail: &str) -> &str {
    detail
        .split_once(':')
        .map_or(detail, |(class, _)| class)
        .trim()
}

pub(super) async fn gateway_access_log(req: Request, next: Next) -> Response {
    let request_id = RequestId::from_headers(req.headers());
    let operation = GatewayOperation::from_path(req.uri().path()).as_str();
    let method = req.method().clone();
    let started_at = Instant::now();

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis() as u64;
    let request_id = request_id.as_str();
    match response.extensions().get::<FailureDetail>() {
        Some(FailureDetail(detail)) if status.is_server_error() => error!(
            request_id,
            operation,
            %method,
            status = status.as_u16(),
            elapsed_ms,
            failure = failure_class(detail),
            detail = %detail,
            "gateway operation failed"
        ),
        Some(FailureDetail(detail)) => warn!(
            request_id,
            operation,
            %method,
            status = status.as_u16(),
            elapsed_ms,
            detail = %detail,
            "gateway request rejected"
        ),
        None => info!(
            request_id,
            operation,
            %method,
            status = status.as_u16(),
            elapsed_ms,
            "gateway request served"
        ),
    }

    response
}
