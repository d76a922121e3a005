use crate::error::ParleyError;
use crate::llm::traits::*;
use futures::channel::mpsc;
use serde_json::Value;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl ClaudeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: "claude-3-5-sonnet-latest".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 1024,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request_body(&self, messages: &[Message]) -> Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
            "stream": true,
        })
    }
}

/// Parse one line of the Messages API event stream.
///
/// Only `data:` lines carry payloads; `event:` lines and keep-alives yield `None`.
/// Text deltas are returned even when empty, leaving it to the consumer to skip them.
pub fn parse_sse_line(line: &str) -> Option<StreamEvent> {
    let data = line.trim().strip_prefix("data:")?.trim_start();
    let event: Value = serde_json::from_str(data).ok()?;

    match event.get("type").and_then(|t| t.as_str()) {
        Some("content_block_delta") => {
            let delta = event.get("delta")?;
            if delta.get("type").and_then(|t| t.as_str()) != Some("text_delta") {
                return None;
            }
            let text = delta.get("text").and_then(|t| t.as_str()).unwrap_or("");
            Some(StreamEvent::TextDelta(text.to_string()))
        }
        Some("message_stop") => Some(StreamEvent::Done),
        Some("error") => {
            let message = event
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown streaming error");
            Some(StreamEvent::Error(message.to_string()))
        }
        _ => None,
    }
}

/// Take every complete line out of `buffer` and parse it, leaving any
/// unterminated tail in place.
///
/// Lines are split on raw bytes so a multi-byte character spanning two
/// network chunks is only decoded once it is whole.
fn drain_events(buffer: &mut Vec<u8>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=line_end).collect();
        if let Some(event) = parse_sse_line(&String::from_utf8_lossy(&line)) {
            events.push(event);
        }
    }
    events
}

/// Final event for a byte stream that closed before `message_stop` was seen.
fn end_of_stream(tail: &[u8]) -> StreamEvent {
    match parse_sse_line(&String::from_utf8_lossy(tail)) {
        Some(event @ (StreamEvent::Done | StreamEvent::Error(_))) => event,
        _ => StreamEvent::Error("response stream ended before message_stop".to_string()),
    }
}

#[async_trait::async_trait]
impl LlmClient for ClaudeClient {
    async fn chat_stream(
        &self,
        messages: &[Message],
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>, ParleyError> {
        let url = format!("{}/v1/messages", self.base_url);
        let request_body = self.build_request_body(messages);

        tracing::debug!(model = %self.model, turns = messages.len(), "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ParleyError::Llm(format!(
                "Claude API error ({}): {}",
                status, text
            )));
        }

        let (tx, rx) = mpsc::unbounded();

        let mut stream = response.bytes_stream();
        tokio::spawn(async move {
            use futures::StreamExt;
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.unbounded_send(StreamEvent::Error(e.to_string()));
                        return;
                    }
                };

                buffer.extend_from_slice(&chunk);
                for event in drain_events(&mut buffer) {
                    let finished = !matches!(event, StreamEvent::TextDelta(_));
                    if tx.unbounded_send(event).is_err() || finished {
                        // Receiver gone (turn abandoned) or stream complete.
                        return;
                    }
                }
            }

            let _ = tx.unbounded_send(end_of_stream(&buffer));
        });

        Ok(rx)
    }
}
