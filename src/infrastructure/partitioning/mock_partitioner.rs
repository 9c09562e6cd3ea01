use std::collections::HashMap;
use std::sync::Mutex;

use crate::application::ports::{
    PartitionOptions, PartitionRequest, PartitionResponse, Partitioner, PartitionerError,
};
use crate::domain::RawElement;

/// Canned partitioner keyed by file name. Unknown files get a single
/// narrative element holding the bytes as UTF-8.
#[derive(Default)]
pub struct MockPartitioner {
    responses: HashMap<String, PartitionResponse>,
    calls: Mutex<Vec<(String, PartitionOptions)>>,
}

impl MockPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements(mut self, file_name: impl Into<String>, elements: Vec<RawElement>) -> Self {
        self.responses.insert(
            file_name.into(),
            PartitionResponse {
                status_code: 200,
                elements: Some(elements),
            },
        );
        self
    }

    pub fn with_status(mut self, file_name: impl Into<String>, status_code: u16) -> Self {
        self.responses.insert(
            file_name.into(),
            PartitionResponse {
                status_code,
                elements: None,
            },
        );
        self
    }

    /// File names and options of every call so far, in call order.
    pub fn calls(&self) -> Vec<(String, PartitionOptions)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Partitioner for MockPartitioner {
    async fn partition(
        &self,
        request: PartitionRequest<'_>,
    ) -> Result<PartitionResponse, PartitionerError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((request.file_name.to_string(), request.options.clone()));
        }

        if let Some(response) = self.responses.get(request.file_name) {
            return Ok(response.clone());
        }

        let text = String::from_utf8_lossy(request.data).into_owned();
        Ok(PartitionResponse {
            status_code: 200,
            elements: Some(vec![RawElement::new("NarrativeText", &text)]),
        })
    }
}
