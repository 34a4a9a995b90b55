use crate::adapter::join_url;
use crate::upstream::UpstreamRequest;
use gateway_core::agent::Agent;
use gateway_core::canonical::{DifyWorkflowRequest, ResponseMode};
use gateway_core::error::GatewayError;
use serde_json::{Map, json};

const PATH: &str = "/v1/workflows/run";

pub fn validate(request: &mut DifyWorkflowRequest) -> Result<(), GatewayError> {
    if request.user.is_empty() {
        return Err(GatewayError::BadRequest("user must not be empty".to_string()));
    }
    if request.inputs.is_none() {
        request.inputs = Some(Map::new());
    }
    if request.response_mode.is_none() {
        request.response_mode = Some(if request.stream {
            ResponseMode::Streaming
        } else {
            ResponseMode::Blocking
        });
    }
    Ok(())
}

pub fn build_upstream(
    request: &DifyWorkflowRequest,
    agent: &Agent,
) -> Result<UpstreamRequest, GatewayError> {
    let response_mode = match request.response_mode {
        Some(ResponseMode::Streaming) => "streaming",
        _ => "blocking",
    };
    let body = json!({
        "inputs": request.inputs.clone().unwrap_or_default(),
        "user": request.user,
        "response_mode": response_mode,
    });

    let url = join_url(&agent.upstream_url, PATH);
    let bytes = serde_json::to_vec(&body)
        .map_err(|e| GatewayError::BadRequest(format!("failed to encode request body: {e}")))?;
    Ok(UpstreamRequest::new(url, &agent.upstream_key, bytes))
}
