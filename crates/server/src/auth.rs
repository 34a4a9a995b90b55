use axum::http::HeaderMap;
use gateway_core::auth_context::AuthContext;
use gateway_core::directory::{AgentDirectory, DirectoryError};
use gateway_core::error::GatewayError;

/// Extracts credentials in order: `Authorization: Bearer <token>`, else
/// `X-API-Key: <token>`. Looks the agent up, compares the credential in
/// constant time, and checks the enabled flag.
pub async fn authenticate(
    headers: &HeaderMap,
    agent_id: Option<&str>,
    directory: &AgentDirectory,
) -> Result<AuthContext, GatewayError> {
    let agent_id = agent_id
        .filter(|id| !id.is_empty())
        .ok_or(GatewayError::MissingCredentials)?;
    let credential = extract_credential(headers).ok_or(GatewayError::MissingCredentials)?;

    let agent = match directory.lookup(agent_id).await {
        Ok(agent) => agent,
        Err(DirectoryError::NotFound) => return Err(GatewayError::InvalidAgent),
        Err(DirectoryError::Repository(e)) => {
            return Err(GatewayError::StoreUnavailable(e.to_string()));
        }
    };

    if !constant_time_eq(credential.as_bytes(), agent.connector_key.as_bytes()) {
        return Err(GatewayError::InvalidCredential);
    }
    if !agent.enabled {
        return Err(GatewayError::AgentDisabled);
    }

    Ok(AuthContext::new(credential, agent))
}

fn extract_credential(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(strip_bearer_prefix)
        .or_else(|| {
            headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        })
}

fn strip_bearer_prefix(value: &str) -> Option<String> {
    let value = value.trim();
    if value.len() >= 7 && value.as_bytes()[..7].eq_ignore_ascii_case(b"bearer ") {
        Some(value[7..].trim().to_string())
    } else {
        None
    }
}

/// Byte-length is not treated as secret; the comparison of equal-length
/// content runs in time independent of where the first mismatch falls.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::agent::{AgentKind, InMemoryAgentRepository, ResponseFormat};
    use gateway_core::agent::Agent;
    use std::sync::Arc;
    use std::time::Duration;

    fn directory_with(agent: Agent) -> AgentDirectory {
        let repo = Arc::new(InMemoryAgentRepository::with_agents([agent]));
        AgentDirectory::new(repo, Duration::from_secs(30))
    }

    fn sample() -> Agent {
        Agent {
            agent_id: "A1".to_string(),
            connector_key: "k1".to_string(),
            upstream_url: "http://up".to_string(),
            upstream_key: "u1".to_string(),
            kind: AgentKind::OpenAi,
            qps: 1,
            enabled: true,
            supports_streaming: true,
            response_format: ResponseFormat::OpenAi,
        }
    }

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn missing_agent_id_is_missing_credentials() {
        let directory = directory_with(sample());
        let headers = headers_with_bearer("k1");
        let err = authenticate(&headers, None, &directory).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredentials));
    }

    #[tokio::test]
    async fn missing_header_is_missing_credentials() {
        let directory = directory_with(sample());
        let err = authenticate(&HeaderMap::new(), Some("A1"), &directory)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredentials));
    }

    #[tokio::test]
    async fn unknown_agent_is_invalid_agent() {
        let directory = directory_with(sample());
        let headers = headers_with_bearer("k1");
        let err = authenticate(&headers, Some("missing"), &directory)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidAgent));
    }

    #[tokio::test]
    async fn wrong_credential_is_invalid_credential() {
        let directory = directory_with(sample());
        let headers = headers_with_bearer("wrong");
        let err = authenticate(&headers, Some("A1"), &directory)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCredential));
    }

    #[tokio::test]
    async fn disabled_agent_is_forbidden() {
        let mut agent = sample();
        agent.enabled = false;
        let directory = directory_with(agent);
        let headers = headers_with_bearer("k1");
        let err = authenticate(&headers, Some("A1"), &directory)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::AgentDisabled));
    }

    #[tokio::test]
    async fn valid_credential_succeeds() {
        let directory = directory_with(sample());
        let headers = headers_with_bearer("k1");
        let ctx = authenticate(&headers, Some("A1"), &directory).await.unwrap();
        assert_eq!(ctx.agent_id, "A1");
    }

    #[tokio::test]
    async fn x_api_key_header_is_accepted() {
        let directory = directory_with(sample());
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "k1".parse().unwrap());
        let ctx = authenticate(&headers, Some("A1"), &directory).await.unwrap();
        assert_eq!(ctx.credential, "k1");
    }
}
