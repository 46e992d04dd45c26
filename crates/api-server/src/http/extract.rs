use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::response::Response;
use serde::de::DeserializeOwned;

use super::errors::rejected_request_response;

/// JSON body extractor whose rejection uses the gateway's `{detail}` shape.
pub(super) struct GatewayJson<T>(pub(super) T);

impl<S, T> FromRequest<S> for GatewayJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection_response(rejection)),
        }
    }
}

/// Query string extractor with the same rejection shape as [`GatewayJson`].
pub(super) struct GatewayQuery<T>(pub(super) T);

impl<S, T> FromRequestParts<S> for GatewayQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection_response(rejection)),
        }
    }
}

fn json_rejection_response(rejection: JsonRejection) -> Response {
    rejected_request_response(rejection.status(), rejection.body_text())
}

fn query_rejection_response(rejection: QueryRejection) -> Response {
    rejected_request_response(rejection.status(), rejection.body_text())
}
