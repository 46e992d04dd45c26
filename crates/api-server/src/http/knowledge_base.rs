use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use shared::assistant::AssistantError;
use shared::knowledge_base::{DEFAULT_NUM_RESULTS, RetrievalError};
use shared::models::{KbRetrievalResponse, QueryRequest, RagResponse, RetrieveParams};

use super::AppState;
use super::errors::internal_error_response;
use super::extract::{GatewayJson, GatewayQuery};

pub(super) async fn kb_retrieve(
    State(state): State<AppState>,
    GatewayQuery(params): GatewayQuery<RetrieveParams>,
    GatewayJson(req): GatewayJson<QueryRequest>,
) -> Response {
    let num_results = params.num_results.unwrap_or(DEFAULT_NUM_RESULTS);

    match state.assistant.retrieve(&req.query, num_results).await {
        Ok(results) => Json(KbRetrievalResponse {
            results,
            query: req.query,
        })
        .into_response(),
        Err(err) => internal_error_response(retrieve_error_detail(&err)),
    }
}

pub(super) async fn kb_rag_query(
    State(state): State<AppState>,
    GatewayJson(req): GatewayJson<QueryRequest>,
) -> Response {
    match state.assistant.rag_query(&req.query).await {
        Ok(answer) => Json(RagResponse {
            answer: answer.answer,
            sources: answer.sources,
            query: answer.query,
        })
        .into_response(),
        Err(err) => internal_error_response(rag_error_detail(&err)),
    }
}

fn retrieve_error_detail(err: &RetrievalError) -> String {
    if err.is_service_error() {
        format!("AWS Bedrock error: {err}")
    } else {
        format!("Error retrieving from knowledge base: {err}")
    }
}

fn rag_error_detail(err: &AssistantError) -> String {
    match err {
        AssistantError::Retrieval(retrieval) if retrieval.is_service_error() => {
            format!("AWS Bedrock error: {retrieval}")
        }
        other => format!("Error processing RAG query: {other}"),
    }
}
