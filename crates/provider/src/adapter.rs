use crate::upstream::{ResponseClass, UpstreamRequest, classify};
use crate::{dify_chat, dify_workflow, openai_compat};
use gateway_core::agent::Agent;
use gateway_core::canonical::CanonicalRequest;
use gateway_core::error::GatewayError;

/// Per-provider request validation, wire-format construction, and response
/// classification. A sealed variant set rather than `dyn Trait`: the core
/// only ever needs to dispatch over these three known wire dialects, so no
/// open-ended plugin loading is required.
#[derive(Debug, Clone, Copy)]
pub enum BackendAdapter {
    OpenAiCompatible,
    DifyChat,
    DifyWorkflow,
}

impl BackendAdapter {
    /// Enforces variant-specific required fields and fills defaults in
    /// place.
    pub fn validate(&self, request: &mut CanonicalRequest) -> Result<(), GatewayError> {
        match (self, request) {
            (Self::OpenAiCompatible, CanonicalRequest::ChatCompletion(r)) => {
                openai_compat::validate(r)
            }
            (Self::DifyChat, CanonicalRequest::DifyChat(r)) => dify_chat::validate(r),
            (Self::DifyWorkflow, CanonicalRequest::DifyWorkflow(r)) => dify_workflow::validate(r),
            _ => Err(GatewayError::BadRequest(
                "canonical request variant does not match adapter".to_string(),
            )),
        }
    }

    /// Produces method (always POST), URL, headers, and body bytes.
    pub fn build_upstream(
        &self,
        request: &CanonicalRequest,
        agent: &Agent,
    ) -> Result<UpstreamRequest, GatewayError> {
        match (self, request) {
            (Self::OpenAiCompatible, CanonicalRequest::ChatCompletion(r)) => {
                openai_compat::build_upstream(r, agent)
            }
            (Self::DifyChat, CanonicalRequest::DifyChat(r)) => {
                dify_chat::build_upstream(r, agent)
            }
            (Self::DifyWorkflow, CanonicalRequest::DifyWorkflow(r)) => {
                dify_workflow::build_upstream(r, agent)
            }
            _ => Err(GatewayError::BadRequest(
                "canonical request variant does not match adapter".to_string(),
            )),
        }
    }

    pub fn classify_response(&self, status: u16, wants_stream: bool) -> ResponseClass {
        classify(status, wants_stream)
    }
}

/// Joins a base URL and a variant-specific path without a doubled or
/// missing slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_trims_trailing_slash() {
        assert_eq!(join_url("http://up/", "/v1/chat"), "http://up/v1/chat");
        assert_eq!(join_url("http://up", "/v1/chat"), "http://up/v1/chat");
    }
}
