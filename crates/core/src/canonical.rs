use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One message in a chat-completion request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// OpenAI-compatible chat completion body. `model` and the sampling fields
/// default inside the adapter's `validate`, not here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Blocking,
    Streaming,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DifyChatRequest {
    pub query: String,
    pub user: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub inputs: Option<Map<String, Value>>,
    #[serde(default)]
    pub response_mode: Option<ResponseMode>,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DifyWorkflowRequest {
    pub user: String,
    #[serde(default)]
    pub inputs: Option<Map<String, Value>>,
    #[serde(default)]
    pub response_mode: Option<ResponseMode>,
    #[serde(default)]
    pub stream: bool,
}

/// The internal, variant-tagged representation of an inbound payload before
/// adapter translation. Owned by the dispatch pipeline for one request.
#[derive(Debug, Clone)]
pub enum CanonicalRequest {
    ChatCompletion(ChatCompletionRequest),
    DifyChat(DifyChatRequest),
    DifyWorkflow(DifyWorkflowRequest),
}

impl CanonicalRequest {
    pub fn wants_stream(&self) -> bool {
        match self {
            Self::ChatCompletion(r) => r.stream,
            Self::DifyChat(r) => {
                matches!(r.response_mode, Some(ResponseMode::Streaming)) || r.stream
            }
            Self::DifyWorkflow(r) => {
                matches!(r.response_mode, Some(ResponseMode::Streaming)) || r.stream
            }
        }
    }
}

/// Disambiguates the legacy `/api/v1/chat` endpoint by probing for the
/// presence of `messages` vs. `query`. Both present is rejected rather than
/// guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyShape {
    ChatCompletion,
    DifyChat,
}

#[derive(Debug, thiserror::Error)]
pub enum LegacyShapeError {
    #[error("request body has neither `messages` nor `query`")]
    Indeterminate,
    #[error("request body has both `messages` and `query`; this is ambiguous")]
    Ambiguous,
}

pub fn infer_legacy_shape(body: &Value) -> Result<LegacyShape, LegacyShapeError> {
    let has_messages = body.get("messages").is_some();
    let has_query = body.get("query").is_some();
    match (has_messages, has_query) {
        (true, true) => Err(LegacyShapeError::Ambiguous),
        (true, false) => Ok(LegacyShape::ChatCompletion),
        (false, true) => Ok(LegacyShape::DifyChat),
        (false, false) => Err(LegacyShapeError::Indeterminate),
    }
}
