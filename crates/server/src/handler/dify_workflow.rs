use crate::AppState;
use crate::dispatch::{RequestKind, dispatch};
use crate::handler::AgentIdQuery;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use bytes::Bytes;
use gateway_core::error::GatewayError;

pub async fn workflows_run(
    State(state): State<AppState>,
    Query(query): Query<AgentIdQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    dispatch(
        &state,
        &headers,
        query.agent_id,
        RequestKind::DifyWorkflow,
        body,
    )
    .await
}
