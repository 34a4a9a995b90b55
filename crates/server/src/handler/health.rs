use crate::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

/// Liveness probe: 200 when the rate-limit store answers, 503 otherwise.
/// `n = 0` so the probe never itself affects admission for a real agent.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.token_store.try_consume("__health__", 0.0, 1.0, 0.0, 0).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "error": e.to_string() })),
        ),
    }
}
