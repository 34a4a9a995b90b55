use crate::adapter::join_url;
use crate::upstream::UpstreamRequest;
use gateway_core::agent::Agent;
use gateway_core::canonical::{ChatCompletionRequest, Role};
use gateway_core::error::GatewayError;
use serde_json::json;

const PATH: &str = "/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub fn validate(request: &mut ChatCompletionRequest) -> Result<(), GatewayError> {
    if request.messages.is_empty() {
        return Err(GatewayError::BadRequest(
            "messages must be a non-empty list".to_string(),
        ));
    }
    for message in &request.messages {
        if message.content.is_empty() {
            return Err(GatewayError::BadRequest(
                "message content must not be empty".to_string(),
            ));
        }
        let _ = match message.role {
            Role::System | Role::User | Role::Assistant => {}
        };
    }
    if request.model.as_deref().is_none_or(str::is_empty) {
        request.model = Some(DEFAULT_MODEL.to_string());
    }
    Ok(())
}

pub fn build_upstream(
    request: &ChatCompletionRequest,
    agent: &Agent,
) -> Result<UpstreamRequest, GatewayError> {
    let mut body = json!({
        "model": request.model.as_deref().unwrap_or(DEFAULT_MODEL),
        "messages": request.messages,
        "stream": request.stream,
    });
    let obj = body.as_object_mut().expect("body is always an object");
    if let Some(max_tokens) = request.max_tokens {
        obj.insert("max_tokens".to_string(), json!(max_tokens));
    }
    if let Some(temperature) = request.temperature {
        obj.insert("temperature".to_string(), json!(temperature));
    }

    let url = join_url(&agent.upstream_url, PATH);
    let bytes = serde_json::to_vec(&body)
        .map_err(|e| GatewayError::BadRequest(format!("failed to encode request body: {e}")))?;
    Ok(UpstreamRequest::new(url, &agent.upstream_key, bytes))
}
