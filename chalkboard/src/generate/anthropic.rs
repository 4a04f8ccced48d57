//! Claude Messages API client with server-sent-event streaming.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use serde::Deserialize;

use super::{FragmentStream, GenerationRequest, Generator};
use crate::error::GenerationError;

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Streaming Claude client.
pub struct AnthropicGenerator {
    api_key: String,
    model: String,
    api_url: String,
    max_tokens: u32,
    http: reqwest::Client,
}

impl AnthropicGenerator {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            max_tokens: 4096,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream, GenerationError> {
        let body = serde_json::json!({
            "model": &self.model,
            "max_tokens": self.max_tokens,
            "system": &request.instruction,
            "messages": [{"role": "user", "content": &request.context}],
            "stream": true,
        });

        let resp = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(role = %request.role, model = %self.model, "Claude stream opened");
        Ok(fragments(resp.bytes_stream()))
    }
}

/// Splits a byte stream into complete SSE lines, tolerating chunk boundaries
/// anywhere (including inside a UTF-8 sequence).
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        }
        lines
    }

    /// Whatever trails the last newline once the byte stream has ended.
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&raw);
        Some(line.trim_end_matches('\r').to_string())
    }
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Text(String),
    Stop,
}

#[derive(Deserialize)]
struct EventData {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct Delta {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Interpret one SSE line. Only `data:` lines carry anything we need.
fn parse_line(line: &str) -> Result<Option<SseEvent>, GenerationError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim_start();
    if data.is_empty() {
        return Ok(None);
    }
    let event: EventData = serde_json::from_str(data)
        .map_err(|e| GenerationError::Stream(format!("bad event payload: {e}")))?;
    match event.kind.as_str() {
        "content_block_delta" => Ok(event
            .delta
            .filter(|d| d.kind == "text_delta")
            .and_then(|d| d.text)
            .map(SseEvent::Text)),
        "message_stop" => Ok(Some(SseEvent::Stop)),
        "error" => {
            let (kind, message) = event
                .error
                .map(|e| (e.kind, e.message))
                .unwrap_or_else(|| ("error".to_string(), "unknown stream error".to_string()));
            Err(GenerationError::Api {
                status: 200,
                body: format!("{kind}: {message}"),
            })
        }
        _ => Ok(None),
    }
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    lines: LineBuffer,
    ready: VecDeque<String>,
    stopped: bool,
    done: bool,
}

impl<S> SseState<S> {
    /// Feed parsed lines until `message_stop`. Lines after it are ignored.
    fn absorb(&mut self, lines: Vec<String>) -> Result<(), GenerationError> {
        for line in lines {
            match parse_line(&line)? {
                Some(SseEvent::Text(text)) => self.ready.push_back(text),
                Some(SseEvent::Stop) => {
                    self.stopped = true;
                    self.done = true;
                    break;
                }
                None => {}
            }
        }
        Ok(())
    }

    fn fail(&mut self, e: GenerationError) -> Result<String, GenerationError> {
        self.done = true;
        self.ready.clear();
        Err(e)
    }
}

/// Decode an SSE body into text fragments. A body that ends without
/// `message_stop` is an error, not a short artifact.
fn fragments<S, B>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        lines: LineBuffer::default(),
        ready: VecDeque::new(),
        stopped: false,
        done: false,
    };
    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(text) = st.ready.pop_front() {
                return Some((Ok(text), st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let lines = st.lines.push(chunk.as_ref());
                    if let Err(e) = st.absorb(lines) {
                        let err = st.fail(e);
                        return Some((err, st));
                    }
                }
                Some(Err(e)) => {
                    let err = st.fail(GenerationError::Transport(e));
                    return Some((err, st));
                }
                None => {
                    let tail: Vec<String> = st.lines.finish().into_iter().collect();
                    if let Err(e) = st.absorb(tail) {
                        let err = st.fail(e);
                        return Some((err, st));
                    }
                    if !st.stopped {
                        let err = st.fail(GenerationError::Stream(
                            "stream ended before message_stop".to_string(),
                        ));
                        return Some((err, st));
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURED: &str = "event: message_start\n\
data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\
\n\
event: content_block_start\n\
data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\
\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Login \"}}\n\
\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"screen\"}}\n\
\n\
event: message_stop\n\
data: {\"type\":\"message_stop\"}\n\
\n";

    type Chunks = stream::Iter<std::vec::IntoIter<Result<Vec<u8>, reqwest::Error>>>;

    fn chunked(text: &str, size: usize) -> Chunks {
        let chunks: Vec<Result<Vec<u8>, reqwest::Error>> = text
            .as_bytes()
            .chunks(size)
            .map(|c| Ok(c.to_vec()))
            .collect();
        stream::iter(chunks)
    }

    #[test]
    fn line_buffer_joins_split_lines() {
        let mut buf = LineBuffer::default();
        assert!(buf.push(b"data: {\"a\"").is_empty());
        let lines = buf.push(b":1}\r\nevent: x\n");
        assert_eq!(lines, vec!["data: {\"a\":1}", "event: x"]);
    }

    #[test]
    fn line_buffer_handles_split_utf8() {
        let mut buf = LineBuffer::default();
        let bytes = "café\n".as_bytes();
        assert!(buf.push(&bytes[..4]).is_empty());
        assert_eq!(buf.push(&bytes[4..]), vec!["café"]);
    }

    #[test]
    fn parse_line_extracts_text_deltas() {
        let line = r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"hi"}}"#;
        assert_eq!(parse_line(line).unwrap(), Some(SseEvent::Text("hi".into())));
        assert_eq!(parse_line("event: ping").unwrap(), None);
        assert_eq!(parse_line(r#"data: {"type":"ping"}"#).unwrap(), None);
        assert_eq!(parse_line(r#"data: {"type":"message_stop"}"#).unwrap(), Some(SseEvent::Stop));
    }

    #[test]
    fn parse_line_surfaces_stream_errors() {
        let line = r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        match parse_line(line) {
            Err(GenerationError::Api { body, .. }) => assert!(body.contains("Overloaded")),
            other => panic!("expected API error, got {other:?}"),
        }
        assert!(matches!(parse_line("data: {not json"), Err(GenerationError::Stream(_))));
    }

    #[tokio::test]
    async fn fragments_survive_arbitrary_chunking() {
        for size in [1, 7, 64, CAPTURED.len()] {
            let text = crate::generate::collect(fragments(chunked(CAPTURED, size))).await.unwrap();
            assert_eq!(text, "Login screen", "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn body_without_message_stop_is_an_error() {
        let cut = CAPTURED.find("event: message_stop").unwrap();
        let partial = &CAPTURED[..cut];
        for size in [1, 7, partial.len()] {
            let result = crate::generate::collect(fragments(chunked(partial, size))).await;
            match result {
                Err(GenerationError::Stream(msg)) => assert!(msg.contains("message_stop")),
                other => panic!("chunk size {size}: expected stream error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn unterminated_final_line_is_still_parsed() {
        let body = CAPTURED.trim_end();
        assert!(body.ends_with(r#"{"type":"message_stop"}"#));
        let text = crate::generate::collect(fragments(chunked(body, 5))).await.unwrap();
        assert_eq!(text, "Login screen");
    }

    #[test]
    fn line_buffer_finish_returns_trailing_bytes() {
        let mut buf = LineBuffer::default();
        assert_eq!(buf.push(b"event: a\ndata: tail\r"), vec!["event: a"]);
        assert_eq!(buf.finish().as_deref(), Some("data: tail"));
        assert_eq!(buf.finish(), None);
    }
}
