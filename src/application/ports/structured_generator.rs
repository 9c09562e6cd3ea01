use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

/// Progressively more complete snapshots of the structured object.
pub type PartialObjectStream =
    Pin<Box<dyn Stream<Item = Result<serde_json::Value, GeneratorError>> + Send + 'static>>;

#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
    -> Result<serde_json::Value, GeneratorError>;

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<PartialObjectStream, GeneratorError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub schema_name: String,
    pub schema: serde_json::Value,
    pub messages: Vec<GenerationMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationMessage {
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessagePart {
    Text(String),
    File {
        file_name: String,
        mime_type: String,
        data: Bytes,
    },
}

impl GenerationMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            parts: vec![MessagePart::Text(text.into())],
        }
    }

    pub fn user(parts: Vec<MessagePart>) -> Self {
        Self {
            role: MessageRole::User,
            parts,
        }
    }

    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text(t) => Some(t.as_str()),
                MessagePart::File { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
    #[error("rate limited")]
    RateLimited,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("configuration: {0}")]
    Configuration(String),
}
