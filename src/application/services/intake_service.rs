use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde_json::Value;

use crate::application::ports::{
    BlobStore, BlobStoreError, DocumentRepository, GeneratorError, RepositoryError,
    StructuredGenerator, UploadOptions,
};
use crate::domain::{
    CompanyId, DocumentId, DocumentRecord, DocumentStatus, ExtractionResult, SourceFile,
    StoragePath, TextChunk, UserId,
};

use super::intake_prompt::{ChunkInsight, chunk_insight_request, document_metadata_request};
use super::{DocumentPipeline, FileValidator, PipelineError, ValidationError};

pub struct IntakeRequest {
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub file: SourceFile,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    pub document: DocumentRecord,
    pub extraction: ExtractionResult,
    pub chunk_count: usize,
    /// Empty when no generator is configured.
    pub insights: Vec<ChunkInsight>,
}

/// What the generator produced for a document before it was stored.
#[derive(Debug, Clone, Default)]
struct GeneratedMetadata {
    document: serde_json::Map<String, Value>,
    insights: Vec<ChunkInsight>,
}

/// Validates, extracts, uploads and records one board document.
pub struct DocumentIntakeService {
    pipeline: Arc<DocumentPipeline>,
    blob_store: Arc<dyn BlobStore>,
    documents: Arc<dyn DocumentRepository>,
    validator: FileValidator,
    generator: Option<Arc<dyn StructuredGenerator>>,
}

impl DocumentIntakeService {
    pub fn new(
        pipeline: Arc<DocumentPipeline>,
        blob_store: Arc<dyn BlobStore>,
        documents: Arc<dyn DocumentRepository>,
        validator: FileValidator,
    ) -> Self {
        Self {
            pipeline,
            blob_store,
            documents,
            validator,
            generator: None,
        }
    }

    /// Describes each document and its chunks with the generator before upload.
    pub fn with_generator(mut self, generator: Arc<dyn StructuredGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Extraction and generation run before upload so a file the partitioner or
    /// generator rejects never reaches storage. If the record cannot be written the uploaded object is
    /// removed again.
    #[tracing::instrument(
        skip(self, request),
        fields(
            file_name = %request.file.file_name,
            user_id = %request.user_id,
            company_id = %request.company_id,
        )
    )]
    pub async fn ingest(&self, request: IntakeRequest) -> Result<IntakeOutcome, IntakeError> {
        let file_type = self.validator.validate(&request.file)?;
        if let Some(content_type) = request.content_type.as_deref() {
            self.validator.validate_mime(content_type)?;
        }

        let processed = self.pipeline.extract(&request.file).await?;
        let chunks = self
            .pipeline
            .chunk(std::slice::from_ref(&processed), &processed.section)?;
        let generated = self.generate(&processed.extraction, &chunks).await?;

        let path = StoragePath::company_document(
            &request.user_id,
            &request.company_id,
            &request.file.file_name,
        );
        let content_type = request
            .content_type
            .clone()
            .unwrap_or_else(|| file_type.as_mime().to_string());

        let path = self
            .blob_store
            .upload(
                &path,
                request.file.data.clone(),
                &content_type,
                UploadOptions { upsert: false },
            )
            .await
            .map_err(|source| IntakeError::UploadFailed {
                path: path.to_string(),
                source,
            })?;
        let url = self.blob_store.public_url(&path);

        let mut document = DocumentRecord::new(
            request.company_id,
            request.user_id,
            request.file.file_name.clone(),
            file_type.default_document_type(),
            url,
            path.to_string(),
        );
        document.status = DocumentStatus::Processing;
        document.metadata = record_metadata(&processed.extraction, chunks.len(), &generated);

        if let Err(e) = self.documents.create(&document).await {
            tracing::error!(error = %e, path = %path, "Document record failed, removing upload");
            if let Err(remove_err) = self.blob_store.remove(&path).await {
                tracing::warn!(error = %remove_err, path = %path, "Compensating delete failed");
            }
            return Err(IntakeError::RecordFailed(e));
        }

        tracing::info!(
            document_id = %document.id,
            chunks = chunks.len(),
            "Document ingested"
        );

        Ok(IntakeOutcome {
            document,
            extraction: processed.extraction,
            chunk_count: chunks.len(),
            insights: generated.insights,
        })
    }

    async fn generate(
        &self,
        extraction: &ExtractionResult,
        chunks: &[TextChunk],
    ) -> Result<GeneratedMetadata, IntakeError> {
        let Some(generator) = &self.generator else {
            return Ok(GeneratedMetadata::default());
        };

        let request = document_metadata_request(&extraction.formatted_text());
        let document = match generator.generate(&request).await? {
            Value::Object(map) => map,
            other => {
                return Err(IntakeError::InvalidPayload(format!(
                    "document metadata must be an object, got {}",
                    other
                )));
            }
        };

        let insights = try_join_all(chunks.iter().map(|chunk| {
            let request = chunk_insight_request(chunk);
            async move {
                let value = generator.generate(&request).await?;
                serde_json::from_value::<ChunkInsight>(value).map_err(|e| {
                    IntakeError::InvalidPayload(format!("chunk {}: {}", chunk.index + 1, e))
                })
            }
        }))
        .await?;

        tracing::debug!(
            metadata_fields = document.len(),
            insights = insights.len(),
            "Generated document metadata"
        );
        Ok(GeneratedMetadata { document, insights })
    }

    /// Deletes the stored object first, then the record.
    #[tracing::instrument(skip(self), fields(document_id = %id))]
    pub async fn remove(&self, id: DocumentId) -> Result<(), IntakeError> {
        let document = self
            .documents
            .get_by_id(id)
            .await
            .map_err(IntakeError::RecordFailed)?
            .ok_or(IntakeError::NotFound(id))?;

        let path = StoragePath::from_public_url(&document.storage_path);
        self.blob_store
            .remove(&path)
            .await
            .map_err(|source| IntakeError::RemoveFailed {
                path: path.to_string(),
                source,
            })?;

        self.documents
            .delete(id)
            .await
            .map_err(IntakeError::RecordFailed)?;
        tracing::info!("Document removed");
        Ok(())
    }
}

fn record_metadata(
    extraction: &ExtractionResult,
    chunk_count: usize,
    generated: &GeneratedMetadata,
) -> Value {
    let mut metadata = extraction.metadata.to_json();
    if let Some(map) = metadata.as_object_mut() {
        map.extend(generated.document.clone());
        if !generated.insights.is_empty() {
            map.insert(
                "analysis".into(),
                generated.insights.iter().map(ChunkInsight::to_json).collect(),
            );
        }
        map.insert("elementCount".into(), extraction.elements.len().into());
        map.insert("chunkCount".into(), chunk_count.into());
        map.insert("processedAt".into(), Utc::now().to_rfc3339().into());
    }
    metadata
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),
    #[error("document processing: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("failed to upload {path}: {source}")]
    UploadFailed {
        path: String,
        source: BlobStoreError,
    },
    #[error("generation: {0}")]
    Generation(#[from] GeneratorError),
    #[error("invalid generated metadata: {0}")]
    InvalidPayload(String),
    #[error("document record: {0}")]
    RecordFailed(RepositoryError),
    #[error("document not found: {0}")]
    NotFound(DocumentId),
    #[error("failed to remove {path}: {source}")]
    RemoveFailed {
        path: String,
        source: BlobStoreError,
    },
}
