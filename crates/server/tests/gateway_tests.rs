//! End-to-end tests driving the router exactly as it's assembled in
//! `app::run()`, against a `wiremock` stub standing in for an agent's
//! upstream. Named after the scenarios (S1-S8) and properties they exercise.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use gateway_core::agent::{Agent, AgentKind, InMemoryAgentRepository, ResponseFormat};
use gateway_core::config::Config;
use gateway_core::directory::AgentDirectory;
use gateway_core::rate_limit::{
    Admission, LimiterRegistry, MemoryTokenBucketStore, RateLimitError, TokenBucketStore,
};
use gateway_server::{AppState, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn agent(agent_id: &str, kind: AgentKind, upstream_url: &str, qps: u32, enabled: bool) -> Agent {
    Agent {
        agent_id: agent_id.to_string(),
        connector_key: "connector-key".to_string(),
        upstream_url: upstream_url.to_string(),
        upstream_key: "upstream-key".to_string(),
        kind,
        qps,
        enabled,
        supports_streaming: true,
        response_format: match kind {
            AgentKind::DifyChat | AgentKind::DifyWorkflow => ResponseFormat::Dify,
            AgentKind::OpenAi | AgentKind::OpenAiCompatible => ResponseFormat::OpenAi,
        },
    }
}

fn state_with(agents: impl IntoIterator<Item = Agent>, store: Arc<dyn TokenBucketStore>) -> AppState {
    let repository = Arc::new(InMemoryAgentRepository::with_agents(agents));
    let directory = Arc::new(AgentDirectory::new(repository, Duration::from_secs(30)));
    let limiter_registry = Arc::new(LimiterRegistry::new(
        Arc::clone(&store),
        "agent_connector".to_string(),
    ));
    AppState {
        config: Arc::new(Config::default()),
        directory,
        limiter_registry,
        token_store: store,
        http_client: reqwest::Client::new(),
    }
}

fn memory_store() -> Arc<dyn TokenBucketStore> {
    Arc::new(MemoryTokenBucketStore::new())
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let router = build_router(state);
    let response = router.oneshot(request).await.expect("request delivered");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body readable");
    let value: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        json!({ "raw": String::from_utf8_lossy(&bytes), "content-type": headers.get("content-type").map(|v| v.to_str().unwrap_or("")) })
    });
    (status, value)
}

fn post(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

// S1: a valid openai-compatible request is admitted, forwarded, and the
// upstream's JSON body is passed straight through.
#[tokio::test]
async fn s1_valid_chat_completion_passes_through() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{"message": {"role": "assistant", "content": "hi there"}}],
        })))
        .mount(&upstream)
        .await;

    let state = state_with(
        [agent("A1", AgentKind::OpenAi, &upstream.uri(), 100, true)],
        memory_store(),
    );
    let req = post(
        "/api/v1/openai/chat/completions?agent_id=A1",
        "connector-key",
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    );

    let (status, body) = send(state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "chatcmpl-1");
}

// S2: once the burst (2 * qps) is exhausted, further requests are rejected
// with 429 rather than forwarded.
#[tokio::test]
async fn s2_burst_exhausted_returns_429() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "ok", "choices": []})))
        .mount(&upstream)
        .await;

    let state = state_with(
        [agent("A1", AgentKind::OpenAi, &upstream.uri(), 1, true)],
        memory_store(),
    );
    let body = json!({"messages": [{"role": "user", "content": "hi"}]});

    for _ in 0..2 {
        let req = post(
            "/api/v1/openai/chat/completions?agent_id=A1",
            "connector-key",
            body.clone(),
        );
        let (status, _) = send(state.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
    }

    let req = post(
        "/api/v1/openai/chat/completions?agent_id=A1",
        "connector-key",
        body,
    );
    let (status, _) = send(state, req).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

// S3: a Dify chat request is translated to the exact upstream wire shape
// Dify expects, defaults included.
#[tokio::test]
async fn s3_dify_chat_wire_shape() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "hi"})))
        .mount(&upstream)
        .await;

    let state = state_with(
        [agent("A2", AgentKind::DifyChat, &upstream.uri(), 100, true)],
        memory_store(),
    );
    let req = post(
        "/api/v1/dify/chat-messages?agent_id=A2",
        "connector-key",
        json!({"query": "hi", "user": "end-user-1"}),
    );

    let (status, body) = send(state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "hi");

    let received = upstream.received_requests().await.expect("requests recorded");
    assert_eq!(received.len(), 1);
    let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(
        sent,
        json!({
            "query": "hi",
            "conversation_id": "",
            "user": "end-user-1",
            "inputs": {},
            "response_mode": "blocking",
        })
    );
}

// S4: a streaming request is forwarded as server-sent events with the
// mandated cache/connection headers, terminated by the [DONE] sentinel.
#[tokio::test]
async fn s4_streaming_request_forwards_as_sse() {
    let upstream = MockServer::start().await;
    let sse_body = "data: {\"delta\":\"hi\"}\n\ndata: [DONE]\n\n";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&upstream)
        .await;

    let state = state_with(
        [agent("A1", AgentKind::OpenAi, &upstream.uri(), 100, true)],
        memory_store(),
    );
    let req = post(
        "/api/v1/openai/chat/completions?agent_id=A1",
        "connector-key",
        json!({"messages": [{"role": "user", "content": "hi"}], "stream": true}),
    );

    let router = build_router(state);
    let response = router.oneshot(req).await.expect("request delivered");
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("cache-control").unwrap(), "no-cache");
    assert_eq!(headers.get("connection").unwrap(), "keep-alive");
    assert!(
        headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("\"delta\":\"hi\""));
    assert!(text.contains("\"event\":\"done\""));
}

// S5: a request with no credential at all is rejected before any agent
// lookup or upstream call happens.
#[tokio::test]
async fn s5_missing_credentials_is_401() {
    let upstream = MockServer::start().await;
    let state = state_with(
        [agent("A1", AgentKind::OpenAi, &upstream.uri(), 100, true)],
        memory_store(),
    );
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/openai/chat/completions?agent_id=A1")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"messages": [{"role": "user", "content": "hi"}]}).to_string(),
        ))
        .unwrap();

    let (status, _) = send(state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(upstream.received_requests().await.unwrap().len(), 0);
}

// S6: a disabled agent's otherwise-valid credential is rejected with 403.
#[tokio::test]
async fn s6_disabled_agent_is_403() {
    let upstream = MockServer::start().await;
    let state = state_with(
        [agent("A1", AgentKind::OpenAi, &upstream.uri(), 100, false)],
        memory_store(),
    );
    let req = post(
        "/api/v1/openai/chat/completions?agent_id=A1",
        "connector-key",
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    );

    let (status, _) = send(state, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// S7 / property: validation runs before rate-limit admission, so a malformed
// body is rejected with 400 even once the bucket is already exhausted, never
// masked behind a 429.
#[tokio::test]
async fn s7_validation_precedes_admission() {
    let upstream = MockServer::start().await;
    let state = state_with(
        [agent("A1", AgentKind::OpenAi, &upstream.uri(), 1, true)],
        memory_store(),
    );

    // Exhaust the burst (2 * qps = 2) with valid requests first.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "ok", "choices": []})))
        .mount(&upstream)
        .await;
    for _ in 0..2 {
        let req = post(
            "/api/v1/openai/chat/completions?agent_id=A1",
            "connector-key",
            json!({"messages": [{"role": "user", "content": "hi"}]}),
        );
        let (status, _) = send(state.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
    }

    let invalid = post(
        "/api/v1/openai/chat/completions?agent_id=A1",
        "connector-key",
        json!({"messages": []}),
    );
    let (status, _) = send(state, invalid).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// S8: health reports 200 when the rate-limit store answers, 503 when it
// doesn't, without ever affecting a real agent's bucket.
#[tokio::test]
async fn s8_health_reflects_store_reachability() {
    let healthy = state_with(Vec::<Agent>::new(), memory_store());
    let req = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(healthy, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let unhealthy = state_with(Vec::<Agent>::new(), Arc::new(AlwaysFailsStore));
    let req = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(unhealthy, req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");
}

// S9 / property: when the rate-limit store is unreachable, dispatch fails
// closed with 500 and never reaches the upstream at all.
#[tokio::test]
async fn s9_store_outage_fails_closed_without_contacting_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "ok", "choices": []})))
        .mount(&upstream)
        .await;

    let state = state_with(
        [agent("A1", AgentKind::OpenAi, &upstream.uri(), 100, true)],
        Arc::new(AlwaysFailsStore),
    );
    let req = post(
        "/api/v1/openai/chat/completions?agent_id=A1",
        "connector-key",
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    );

    let (status, _) = send(state, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(upstream.received_requests().await.unwrap().len(), 0);
}

struct AlwaysFailsStore;

#[async_trait]
impl TokenBucketStore for AlwaysFailsStore {
    async fn try_consume(
        &self,
        _key: &str,
        _rate: f64,
        _burst: f64,
        _n: f64,
        _now_ms: i64,
    ) -> Result<Admission, RateLimitError> {
        Err(RateLimitError::StoreUnavailable("simulated outage".to_string()))
    }
}
