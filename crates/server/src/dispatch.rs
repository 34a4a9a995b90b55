use crate::AppState;
use crate::auth;
use crate::streaming::sse_response;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use gateway_core::canonical::{
    CanonicalRequest, ChatCompletionRequest, DifyChatRequest, DifyWorkflowRequest, LegacyShape,
    LegacyShapeError, infer_legacy_shape,
};
use gateway_core::error::GatewayError;
use gateway_provider::upstream::ResponseClass;
use serde_json::Value;
use std::time::Duration;

/// Which canonical shape an endpoint family decodes its body into. `Legacy`
/// infers the shape from the body itself.
pub enum RequestKind {
    ChatCompletion,
    DifyChat,
    DifyWorkflow,
    Legacy,
}

const BUFFERED_TIMEOUT: Duration = Duration::from_secs(120);
const STREAMING_TIMEOUT: Duration = Duration::from_secs(300);

/// PARSED → AUTHENTICATED → VALIDATED → ADMITTED → UPSTREAM_OPEN → (STREAMING | BUFFERED) → DONE.
pub async fn dispatch(
    state: &AppState,
    headers: &HeaderMap,
    query_agent_id: Option<String>,
    kind: RequestKind,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::BadRequest(format!("invalid JSON body: {e}")))?;

    let mut canonical = decode_canonical(kind, &value)?;

    let agent_id = query_agent_id.or_else(|| {
        value
            .get("agent_id")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let ctx = auth::authenticate(headers, agent_id.as_deref(), &state.directory).await?;
    let agent = ctx.agent;

    let adapter = gateway_provider::factory::adapter_for(agent.kind)?;
    adapter.validate(&mut canonical)?;

    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    let admission = state
        .limiter_registry
        .check(&agent.agent_id, agent.qps, now_ms)
        .await
        .map_err(|e| GatewayError::StoreUnavailable(e.to_string()))?;
    if !admission.allowed {
        return Err(GatewayError::RateLimited { qps: agent.qps });
    }

    let wants_stream = canonical.wants_stream();
    if wants_stream && !agent.supports_streaming {
        return Err(GatewayError::StreamingUnsupported);
    }

    let upstream_req = adapter.build_upstream(&canonical, &agent)?;
    let timeout = if wants_stream {
        STREAMING_TIMEOUT
    } else {
        BUFFERED_TIMEOUT
    };

    let mut builder = state
        .http_client
        .post(&upstream_req.url)
        .timeout(timeout)
        .body(upstream_req.body);
    for (name, value) in &upstream_req.headers {
        builder = builder.header(name, value);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| GatewayError::UpstreamTransport(e.to_string()))?;
    let status = response.status().as_u16();

    match adapter.classify_response(status, wants_stream) {
        ResponseClass::UpstreamError(status) => {
            let body = response
                .text()
                .await
                .map_err(|e| GatewayError::UpstreamTransport(e.to_string()))?;
            Err(GatewayError::UpstreamError { status, body })
        }
        ResponseClass::OkBuffered => {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| GatewayError::UpstreamTransport(e.to_string()))?;
            let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
                GatewayError::UpstreamTransport(format!("invalid upstream body: {e}"))
            })?;
            Ok((StatusCode::OK, axum::Json(value)).into_response())
        }
        ResponseClass::OkStream => Ok(sse_response(response.bytes_stream())),
    }
}

fn decode_canonical(kind: RequestKind, value: &Value) -> Result<CanonicalRequest, GatewayError> {
    match kind {
        RequestKind::ChatCompletion => {
            decode::<ChatCompletionRequest>(value).map(CanonicalRequest::ChatCompletion)
        }
        RequestKind::DifyChat => decode::<DifyChatRequest>(value).map(CanonicalRequest::DifyChat),
        RequestKind::DifyWorkflow => {
            decode::<DifyWorkflowRequest>(value).map(CanonicalRequest::DifyWorkflow)
        }
        RequestKind::Legacy => match infer_legacy_shape(value) {
            Ok(LegacyShape::ChatCompletion) => {
                decode::<ChatCompletionRequest>(value).map(CanonicalRequest::ChatCompletion)
            }
            Ok(LegacyShape::DifyChat) => {
                decode::<DifyChatRequest>(value).map(CanonicalRequest::DifyChat)
            }
            Err(LegacyShapeError::Ambiguous) => Err(GatewayError::BadRequest(
                "request body has both `messages` and `query`".to_string(),
            )),
            Err(LegacyShapeError::Indeterminate) => Err(GatewayError::BadRequest(
                "request body has neither `messages` nor `query`".to_string(),
            )),
        },
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, GatewayError> {
    serde_json::from_value(value.clone()).map_err(|e| GatewayError::BadRequest(e.to_string()))
}
