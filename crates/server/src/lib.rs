pub mod auth;
pub mod dispatch;
pub mod handler;
pub mod middleware;
pub mod streaming;

use gateway_core::config::Config;
use gateway_core::directory::AgentDirectory;
use gateway_core::rate_limit::{LimiterRegistry, TokenBucketStore};
use axum::{Router, middleware as axum_mw};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<AgentDirectory>,
    pub limiter_registry: Arc<LimiterRegistry>,
    pub token_store: Arc<dyn TokenBucketStore>,
    pub http_client: reqwest::Client,
}

pub fn build_router(state: AppState) -> Router {
    let body_limit_bytes = state.config.max_request_body_size;

    let api_routes = Router::new()
        .route(
            "/api/v1/openai/chat/completions",
            axum::routing::post(handler::openai::chat_completions),
        )
        .route(
            "/api/v1/dify/chat-messages",
            axum::routing::post(handler::dify_chat::chat_messages),
        )
        .route(
            "/api/v1/dify/workflows/run",
            axum::routing::post(handler::dify_workflow::workflows_run),
        )
        .route("/api/v1/chat", axum::routing::post(handler::legacy::chat))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes));

    let health_routes =
        Router::new().route("/api/v1/health", axum::routing::get(handler::health::health));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .layer(axum_mw::from_fn(
            middleware::request_logging::request_logging_middleware,
        ))
        .layer(axum_mw::from_fn(
            middleware::request_context::request_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
