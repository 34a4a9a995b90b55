use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::convert::Infallible;

/// Wraps the upstream byte stream in `gateway_provider::sse::forward` and
/// attaches the headers the streaming path of the dispatch pipeline requires.
/// `axum::response::sse::Sse` already sets `content-type: text/event-stream`.
pub fn sse_response(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> Response {
    let events = gateway_provider::sse::forward(byte_stream).map(Ok::<Event, Infallible>);
    let mut response = Sse::new(events).into_response();
    let headers = response.headers_mut();
    headers.insert(
        axum::http::header::CACHE_CONTROL,
        "no-cache".parse().expect("static header value"),
    );
    headers.insert(
        axum::http::header::CONNECTION,
        "keep-alive".parse().expect("static header value"),
    );
    response
}
