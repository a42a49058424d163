use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use docchat_core::error::{Error, Result};
use docchat_core::types::{Delta, DeltaReceiver, Message};

use crate::provider::LlmClient;

/// Client for any server speaking the OpenAI chat-completions protocol
/// (OpenAI itself, OpenAI-like gateways, Ollama's `/v1` endpoint).
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    api_base: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    client: Client,
}

impl OpenAiCompatibleClient {
    pub fn new(api_base: String, model: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            api_key: None,
            temperature: None,
            max_tokens: None,
            client: Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_sampling(mut self, temperature: Option<f64>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn request_body(&self, messages: &[Message]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = self.temperature { obj.insert("temperature".to_string(), json!(t)); }
            if let Some(t) = self.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
        }
        body
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(Delta),
    Done,
    Skip,
}

/// Interpret one server-sent-events line.
fn parse_sse_line(line: &str) -> Result<SseEvent> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }
    let value: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "skipping malformed stream line");
            return Ok(SseEvent::Skip);
        }
    };
    if let Some(err) = value.get("error") {
        let message = err.get("message").and_then(Value::as_str).map(str::to_string).unwrap_or_else(|| err.to_string());
        return Err(Error::Generation(message));
    }
    let chunk: StreamChunk = serde_json::from_value(value).map_err(Error::generation)?;
    match chunk.choices.into_iter().next() {
        Some(choice) => Ok(SseEvent::Delta(Delta::Chunk { delta: choice.delta.content })),
        None => Ok(SseEvent::Skip),
    }
}

/// Append `bytes` to `pending` and take every complete line out of it.
/// Lines are decoded only once whole, so a multibyte character split across
/// network chunks survives. At `eof` an unterminated tail counts as a line.
fn drain_lines(pending: &mut Vec<u8>, bytes: &[u8], eof: bool) -> Vec<String> {
    pending.extend_from_slice(bytes);
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = pending.drain(..=pos).collect();
        lines.push(String::from_utf8_lossy(&line).into_owned());
    }
    if eof && !pending.is_empty() {
        lines.push(String::from_utf8_lossy(pending).into_owned());
        pending.clear();
    }
    lines
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, messages: Vec<Message>) -> Result<DeltaReceiver> {
        let url = format!("{}/chat/completions", self.api_base);
        let mut request = self.client.post(&url).json(&self.request_body(&messages));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(Error::generation)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("{} returned {}: {}", url, status, text)));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            let mut pending: Vec<u8> = Vec::new();
            loop {
                let item = tokio::select! {
                    _ = tx.closed() => {
                        debug!("response consumer went away; closing completion stream");
                        return;
                    }
                    item = stream.next() => item,
                };
                let (lines, eof) = match item {
                    Some(Ok(bytes)) => (drain_lines(&mut pending, &bytes, false), false),
                    Some(Err(e)) => {
                        let _ = tx.send(Err(Error::generation(e))).await;
                        return;
                    }
                    None => (drain_lines(&mut pending, &[], true), true),
                };
                for line in lines {
                    match parse_sse_line(&line) {
                        Ok(SseEvent::Delta(delta)) => {
                            if tx.send(Ok(delta)).await.is_err() {
                                return;
                            }
                        }
                        Ok(SseEvent::Done) => return,
                        Ok(SseEvent::Skip) => {}
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
                if eof {
                    return;
                }
            }
        });

        Ok(rx)
    }
}
