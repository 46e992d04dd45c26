use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::ErrorResponse;

/// Detail text attached to every `{detail}` response so the access log can
/// report what went wrong without re-reading the body.
#[derive(Debug, Clone)]
pub(super) struct FailureDetail(pub(super) String);

pub(super) fn internal_error_response(detail: String) -> Response {
    detail_response(StatusCode::INTERNAL_SERVER_ERROR, detail)
}

pub(super) fn service_unavailable_response(detail: String) -> Response {
    detail_response(StatusCode::SERVICE_UNAVAILABLE, detail)
}

/// Body or query string that failed to deserialize. Keeps the extractor's
/// status (400, 415 or 422).
pub(super) fn rejected_request_response(status: StatusCode, detail: String) -> Response {
    detail_response(status, detail)
}

fn detail_response(status: StatusCode, detail: String) -> Response {
    let mut response = (
        status,
        Json(ErrorResponse {
            detail: detail.clone(),
        }),
    )
        .into_response();
    response.extensions_mut().insert(FailureDetail(detail));
    response
}
