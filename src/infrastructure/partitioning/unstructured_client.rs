use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::instrument;

use crate::application::ports::{
    PartitionOptions, PartitionRequest, PartitionResponse, Partitioner, PartitionerError,
};
use crate::domain::RawElement;

pub const PARTITION_PATH: &str = "/general/v0/general";
pub const API_KEY_HEADER: &str = "unstructured-api-key";

/// HTTP client for an Unstructured-compatible partitioning API. Holds one
/// pooled connection set and is shared across calls.
pub struct UnstructuredClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl UnstructuredClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PartitionerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PartitionerError::RequestFailed(format!("client build: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), PARTITION_PATH),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl Partitioner for UnstructuredClient {
    #[instrument(
        skip(self, request),
        fields(file_name = %request.file_name, size = request.data.len(), strategy = request.options.strategy.as_str())
    )]
    async fn partition(
        &self,
        request: PartitionRequest<'_>,
    ) -> Result<PartitionResponse, PartitionerError> {
        let file_part = Part::bytes(request.data.to_vec()).file_name(request.file_name.to_string());
        let form = form_fields(&request.options)
            .into_iter()
            .fold(Form::new().part("files", file_part), |form, (name, value)| {
                form.text(name, value)
            });

        let mut builder = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PartitionerError::RequestFailed(e.to_string()))?;

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status_code, body = %body, "Partitioning request rejected");
            return Ok(PartitionResponse {
                status_code,
                elements: None,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| PartitionerError::InvalidResponse(e.to_string()))?;
        let elements = parse_elements(&body)?;

        tracing::debug!(elements = elements.len(), "Partitioning succeeded");
        Ok(PartitionResponse {
            status_code,
            elements: Some(elements),
        })
    }
}

/// Multipart text fields for the options. Format-specific flags are only sent
/// when set; `languages` is repeated once per language.
pub fn form_fields(options: &PartitionOptions) -> Vec<(&'static str, String)> {
    let mut fields = vec![("strategy", options.strategy.as_str().to_string())];
    fields.extend(options.languages.iter().map(|l| ("languages", l.clone())));

    let flags = [
        ("preserve_formulas", options.preserve_formulas),
        ("extract_cell_formats", options.extract_cell_formats),
        ("preserve_formatting", options.preserve_formatting),
        ("extract_images", options.extract_images),
        ("include_header_footer", options.include_header_footer),
        ("split_pdf_page", options.split_pdf_page),
        ("split_pdf_allow_failed", options.split_pdf_allow_failed),
    ];
    fields.extend(
        flags
            .into_iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(name, _)| (name, "true".to_string())),
    );

    if let Some(level) = options.split_pdf_concurrency_level {
        fields.push(("split_pdf_concurrency_level", level.to_string()));
    }
    fields
}

pub fn parse_elements(body: &str) -> Result<Vec<RawElement>, PartitionerError> {
    serde_json::from_str(body).map_err(|e| PartitionerError::InvalidResponse(e.to_string()))
}
