use axum::response::sse::Event;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::json;
use std::pin::Pin;

/// Line-oriented server-sent-event forwarder. Reads the upstream body as
/// lines; for each `data: ` line, re-serializes the JSON payload and emits
/// it; `[DONE]` and malformed JSON terminate the stream with a sentinel or
/// error event respectively; early EOF still emits the `done` sentinel so
/// clients always see a termination signal.
pub fn forward(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> impl Stream<Item = Event> + Send {
    forward_payloads(byte_stream).map(|payload| Event::default().data(payload))
}

/// Same algorithm as [`forward`] but yielding the raw JSON payload strings
/// rather than `axum` SSE events, for testing without depending on `Event`'s
/// (non-)implementation of `Debug`/`PartialEq`.
fn forward_payloads(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> impl Stream<Item = String> + Send {
    futures::stream::unfold(State::new(byte_stream), step)
}

struct State {
    stream: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: String,
    terminated: bool,
}

impl State {
    fn new(byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static) -> Self {
        Self {
            stream: Box::pin(byte_stream),
            buffer: String::new(),
            terminated: false,
        }
    }
}

async fn step(mut state: State) -> Option<(String, State)> {
    if state.terminated {
        return None;
    }

    loop {
        if let Some(pos) = state.buffer.find('\n') {
            let line = state.buffer[..pos].trim_end_matches('\r').to_string();
            state.buffer.drain(..=pos);

            if line.is_empty() {
                continue;
            }

            let Some(remainder) = line.strip_prefix("data: ") else {
                continue;
            };

            if remainder == "[DONE]" {
                state.terminated = true;
                return Some((done_payload(), state));
            }

            return match serde_json::from_str::<serde_json::Value>(remainder) {
                Ok(value) => Some((value.to_string(), state)),
                Err(e) => {
                    state.terminated = true;
                    Some((error_payload(&e.to_string()), state))
                }
            };
        }

        match state.stream.next().await {
            Some(Ok(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => state.buffer.push_str(text),
                Err(e) => {
                    state.terminated = true;
                    return Some((error_payload(&format!("invalid UTF-8 in stream: {e}")), state));
                }
            },
            Some(Err(e)) => {
                state.terminated = true;
                return Some((error_payload(&e.to_string()), state));
            }
            None => {
                state.terminated = true;
                return Some((done_payload(), state));
            }
        }
    }
}

fn done_payload() -> String {
    json!({"event": "done"}).to_string()
}

fn error_payload(message: &str) -> String {
    json!({
        "error": {
            "type": "decode_error",
            "message": message,
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_chunks(lines: &[&str]) -> impl Stream<Item = Result<Bytes, reqwest::Error>> {
        let joined = lines.join("\n") + "\n";
        futures::stream::once(async move { Ok(Bytes::from(joined)) })
    }

    #[tokio::test]
    async fn passes_through_events_then_done() {
        let stream = byte_chunks(&["data: {\"a\":1}", "data: {\"a\":2}", "data: [DONE]"]);
        let payloads: Vec<String> = forward_payloads(stream).collect().await;
        assert_eq!(payloads.len(), 3);
        assert!(payloads[0].contains("\"a\":1"));
        assert!(payloads[1].contains("\"a\":2"));
        assert!(payloads[2].contains("\"event\":\"done\""));
    }

    #[tokio::test]
    async fn terminates_on_malformed_json_with_single_error_event() {
        let stream = byte_chunks(&["data: not json", "data: {\"a\":1}"]);
        let payloads: Vec<String> = forward_payloads(stream).collect().await;
        assert_eq!(payloads.len(), 1);
        assert!(payloads[0].contains("decode_error"));
    }

    #[tokio::test]
    async fn emits_done_sentinel_on_early_eof() {
        let stream = byte_chunks(&["data: {\"a\":1}"]);
        let payloads: Vec<String> = forward_payloads(stream).collect().await;
        assert_eq!(payloads.len(), 2);
        assert!(payloads[1].contains("\"event\":\"done\""));
    }

    #[tokio::test]
    async fn ignores_non_data_lines() {
        let stream = byte_chunks(&[
            ": comment",
            "event: message",
            "data: {\"a\":1}",
            "data: [DONE]",
        ]);
        let payloads: Vec<String> = forward_payloads(stream).collect().await;
        assert_eq!(payloads.len(), 2);
    }
}
