use crate::AppState;
use crate::dispatch::{RequestKind, dispatch};
use crate::handler::AgentIdQuery;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use bytes::Bytes;
use gateway_core::error::GatewayError;

/// Infers `ChatCompletion` vs. `DifyChat` from the body's `messages`/`query`
/// fields; both present or neither present is rejected as `BadRequest`.
pub async fn chat(
    State(state): State<AppState>,
    Query(query): Query<AgentIdQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    dispatch(&state, &headers, query.agent_id, RequestKind::Legacy, body).await
}
