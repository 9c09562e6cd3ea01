use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{
    GenerationRequest, GeneratorError, PartialObjectStream, StructuredGenerator,
};

use super::partial_json::PartialObjectAccumulator;

const STREAM_PIECE_CHARS: usize = 24;

enum Scripted {
    Value(Value),
    Failure(String),
}

/// Replays scripted outputs in call order; the last one repeats once the
/// script runs out. Streams are produced by feeding the serialized value
/// through the same accumulator the real client uses.
pub struct MockStructuredGenerator {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Scripted,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockStructuredGenerator {
    pub fn returning(value: Value) -> Self {
        Self::new(Vec::new(), Scripted::Value(value))
    }

    pub fn returning_each(values: Vec<Value>) -> Self {
        let fallback = values
            .last()
            .cloned()
            .map(Scripted::Value)
            .unwrap_or(Scripted::Failure("no scripted output".into()));
        Self::new(values.into_iter().map(Scripted::Value).collect(), fallback)
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(Vec::new(), Scripted::Failure(message.into()))
    }

    fn new(script: Vec<Scripted>, fallback: Scripted) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    fn next_output(&self, request: &GenerationRequest) -> Result<Value, GeneratorError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match scripted.as_ref().unwrap_or(&self.fallback) {
            Scripted::Value(value) => Ok(value.clone()),
            Scripted::Failure(message) => Err(GeneratorError::ApiRequestFailed(message.clone())),
        }
    }
}

#[async_trait]
impl StructuredGenerator for MockStructuredGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GeneratorError> {
        self.next_output(request)
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<PartialObjectStream, GeneratorError> {
        let value = self.next_output(request)?;
        let text = value.to_string();
        let chars: Vec<char> = text.chars().collect();

        let mut accumulator = PartialObjectAccumulator::new();
        let mut snapshots: Vec<Result<Value, GeneratorError>> = chars
            .chunks(STREAM_PIECE_CHARS)
            .filter_map(|piece| accumulator.push(&piece.iter().collect::<String>()))
            .map(Ok)
            .collect();
        if let Some(last) = accumulator.finish().transpose() {
            snapshots.push(last);
        }

        Ok(Box::pin(futures::stream::iter(snapshots)))
    }
}
