use std::collections::HashMap;

/// Method, URL, headers, and body bytes for a request to an agent's
/// upstream, produced by `BackendAdapter::build_upstream`.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl UpstreamRequest {
    pub fn new(url: String, upstream_key: &str, body: Vec<u8>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), format!("Bearer {upstream_key}"));
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self { url, headers, body }
    }
}

/// What the dispatch pipeline should do with a completed upstream response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    OkBuffered,
    OkStream,
    UpstreamError(u16),
}

pub fn classify(status: u16, wants_stream: bool) -> ResponseClass {
    if !(200..300).contains(&status) {
        return ResponseClass::UpstreamError(status);
    }
    if wants_stream {
        ResponseClass::OkStream
    } else {
        ResponseClass::OkBuffered
    }
}
