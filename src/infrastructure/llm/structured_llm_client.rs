use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::application::ports::{
    GenerationRequest, GeneratorError, MessagePart, PartialObjectStream, StructuredGenerator,
};
use crate::infrastructure::observability::sanitize_prompt;

use super::partial_json::PartialObjectAccumulator;

const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmAuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `api-key: <key>`, as Azure OpenAI expects.
    ApiKeyHeader,
}

#[derive(Debug, Clone)]
pub struct StructuredLlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    pub auth: LlmAuthScheme,
}

/// Structured generation over an OpenAI-compatible chat completions API,
/// constrained by a `json_schema` response format.
pub struct StructuredLlmClient {
    client: Client,
    config: StructuredLlmConfig,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl StructuredLlmClient {
    pub fn new(config: StructuredLlmConfig) -> Result<Self, GeneratorError> {
        if config.api_key.is_empty() {
            return Err(GeneratorError::Configuration("llm api_key is not set".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GeneratorError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            config: StructuredLlmConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, GeneratorError> {
        let request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .json(body);
        let request = match self.config.auth {
            LlmAuthScheme::Bearer => {
                request.header("Authorization", format!("Bearer {}", self.config.api_key))
            }
            LlmAuthScheme::ApiKeyHeader => request.header("api-key", &self.config.api_key),
        };

        let response = request
            .send()
            .await
            .map_err(|e| GeneratorError::ApiRequestFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeneratorError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::ApiRequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        Ok(response)
    }

    fn log_request(&self, request: &GenerationRequest) {
        let prompt = request
            .messages
            .last()
            .map(|m| m.text())
            .unwrap_or_default();
        tracing::debug!(
            model = %self.config.model,
            schema = %request.schema_name,
            prompt = %sanitize_prompt(&prompt),
            "Structured generation request"
        );
    }
}

#[async_trait]
impl StructuredGenerator for StructuredLlmClient {
    #[instrument(skip(self, request), fields(schema = %request.schema_name))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GeneratorError> {
        self.log_request(request);
        let body = request_body(
            &self.config.model,
            self.config.max_tokens,
            self.config.temperature,
            request,
            false,
        );
        let response = self.send(&body).await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GeneratorError::InvalidResponse("empty choices".to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| GeneratorError::InvalidResponse(format!("output is not JSON: {e}")))
    }

    #[instrument(skip(self, request), fields(schema = %request.schema_name))]
    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<PartialObjectStream, GeneratorError> {
        self.log_request(request);
        let body = request_body(
            &self.config.model,
            self.config.max_tokens,
            self.config.temperature,
            request,
            true,
        );
        let response = self.send(&body).await?;

        let state = SnapshotStream {
            bytes: response.bytes_stream().boxed(),
            decoder: SseDecoder::default(),
            accumulator: PartialObjectAccumulator::new(),
            pending: VecDeque::new(),
            finished: false,
        };

        Ok(Box::pin(futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                if state.finished {
                    return None;
                }
                match state.bytes.next().await {
                    Some(Ok(bytes)) => state.consume(&bytes),
                    Some(Err(e)) => {
                        state.pending.push_back(Err(GeneratorError::ApiRequestFailed(e.to_string())));
                        state.finished = true;
                    }
                    None => state.finish(),
                }
            }
        })))
    }
}

struct SnapshotStream {
    bytes: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    accumulator: PartialObjectAccumulator,
    pending: VecDeque<Result<Value, GeneratorError>>,
    finished: bool,
}

impl SnapshotStream {
    fn consume(&mut self, bytes: &[u8]) {
        for data in self.decoder.push(bytes) {
            if data == DONE_MARKER {
                self.finish();
                return;
            }
            let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(&data) else {
                tracing::trace!(data = %data, "Skipping unparseable stream event");
                continue;
            };
            let delta = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content);
            if let Some(snapshot) = delta.and_then(|d| self.accumulator.push(&d)) {
                self.pending.push_back(Ok(snapshot));
            }
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        match self.accumulator.finish() {
            Ok(Some(value)) => self.pending.push_back(Ok(value)),
            Ok(None) => {}
            Err(e) => self.pending.push_back(Err(e)),
        }
    }
}

/// Splits a server-sent-events byte stream into `data:` payloads. Lines may
/// arrive split across network chunks, so incomplete lines are buffered.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }

        payloads
    }
}

/// Chat completions body with a non-strict `json_schema` response format.
/// File parts are sent inline as base64 data URLs.
pub fn request_body(
    model: &str,
    max_tokens: u32,
    temperature: f32,
    request: &GenerationRequest,
    stream: bool,
) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|message| {
            let content: Vec<Value> = message
                .parts
                .iter()
                .map(|part| match part {
                    MessagePart::Text(text) => json!({ "type": "text", "text": text }),
                    MessagePart::File {
                        file_name,
                        mime_type,
                        data,
                    } => json!({
                        "type": "file",
                        "file": {
                            "filename": file_name,
                            "file_data": format!(
                                "data:{};base64,{}",
                                mime_type,
                                general_purpose::STANDARD.encode(data)
                            ),
                        }
                    }),
                })
                .collect();
            json!({ "role": message.role.as_str(), "content": content })
        })
        .collect();

    let mut body = json!({
        "model": model,
        "messages": messages,
        "max_tokens": max_tokens,
        "temperature": temperature,
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": request.schema_name,
                "schema": request.schema,
                "strict": false,
            }
        }
    });
    if stream {
        body["stream"] = Value::Bool(true);
    }
    body
}
