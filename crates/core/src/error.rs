use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// Unified error type for the gateway's request-processing data plane. Kinds
/// mirror the taxonomy the dispatch pipeline enforces; each maps to exactly
/// one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("missing credentials")]
    MissingCredentials,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("invalid agent")]
    InvalidAgent,

    #[error("agent disabled")]
    AgentDisabled,

    #[error("agent does not support streaming")]
    StreamingUnsupported,

    #[error("unsupported agent kind")]
    UnsupportedAgentKind,

    #[error("rate limit exceeded")]
    RateLimited { qps: u32 },

    #[error("upstream returned status {status}: {body}")]
    UpstreamError { status: u16, body: String },

    #[error("upstream transport error: {0}")]
    UpstreamTransport(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("client disconnected")]
    ClientDisconnected,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_)
            | Self::StreamingUnsupported
            | Self::UnsupportedAgentKind => StatusCode::BAD_REQUEST,
            Self::MissingCredentials | Self::InvalidCredential | Self::InvalidAgent => {
                StatusCode::UNAUTHORIZED
            }
            Self::AgentDisabled => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamError { .. } | Self::UpstreamTransport(_) | Self::StoreUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // Never actually written to the wire; the connection is already gone.
            Self::ClientDisconnected => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "invalid_request_error",
            Self::MissingCredentials | Self::InvalidCredential | Self::InvalidAgent => {
                "authentication_error"
            }
            Self::AgentDisabled => "permission_error",
            Self::StreamingUnsupported | Self::UnsupportedAgentKind => "invalid_request_error",
            Self::RateLimited { .. } => "rate_limit_error",
            Self::UpstreamError { .. } => "upstream_error",
            Self::UpstreamTransport(_) | Self::StoreUnavailable(_) => "server_error",
            Self::ClientDisconnected => "client_disconnected",
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::MissingCredentials => "missing_credentials",
            Self::InvalidCredential => "invalid_credential",
            Self::InvalidAgent => "invalid_agent",
            Self::AgentDisabled => "agent_disabled",
            Self::StreamingUnsupported => "streaming_unsupported",
            Self::UnsupportedAgentKind => "unsupported_agent_kind",
            Self::RateLimited { .. } => "rate_limit_exceeded",
            Self::UpstreamError { .. } => "upstream_error",
            Self::UpstreamTransport(_) => "upstream_transport_error",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::ClientDisconnected => "client_disconnected",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // For upstream errors, pass the original JSON body through verbatim
        // rather than re-wrapping it in the standard error envelope.
        if let Self::UpstreamError { body, .. } = &self
            && serde_json::from_str::<Value>(body).is_ok()
        {
            return (status, [("content-type", "application/json")], body.clone()).into_response();
        }

        let code = status.as_u16();
        let message = self.to_string();

        let body = json!({
            "code": code,
            "message": message,
            "error": {
                "type": self.error_type(),
                "code": self.error_code(),
                "message": message,
            }
        });

        let mut response = (status, [("content-type", "application/json")], body.to_string())
            .into_response();

        if let Self::RateLimited { qps } = self {
            let headers = response.headers_mut();
            headers.insert(
                "x-ratelimit-agent-qps",
                qps.to_string().parse().expect("qps header value"),
            );
            headers.insert("retry-after", "1".parse().expect("retry-after header value"));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_maps_to_429() {
        assert_eq!(
            GatewayError::RateLimited { qps: 5 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn agent_disabled_maps_to_403() {
        assert_eq!(GatewayError::AgentDisabled.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_credentials_maps_to_401() {
        assert_eq!(
            GatewayError::MissingCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn store_unavailable_maps_to_500() {
        assert_eq!(
            GatewayError::StoreUnavailable("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn upstream_error_passes_valid_json_body_through_verbatim() {
        let err = GatewayError::UpstreamError {
            status: 400,
            body: r#"{"error":{"message":"bad model"}}"#.to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"error": {"message": "bad model"}}));
    }

    #[tokio::test]
    async fn upstream_error_wraps_non_json_body_in_standard_envelope() {
        let err = GatewayError::UpstreamError {
            status: 502,
            body: "not json".to_string(),
        };
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"]["code"], "upstream_error");
    }
}
