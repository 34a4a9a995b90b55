use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Per-request metadata threaded through `Extension` for the logging
/// middleware. Scoped to one request; never shared.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: Option<String>,
    start: Instant,
}

impl RequestContext {
    fn new(client_ip: Option<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            client_ip,
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let client_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or("").trim().to_string())
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        });

    let ctx = RequestContext::new(client_ip);
    request.extensions_mut().insert(ctx);
    next.run(request).await
}
