use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::try_join_all;

use crate::application::ports::{
    BlobStore, BlobStoreError, DEFAULT_PDF_SPLIT_CONCURRENCY, PartitionOptions, PartitionRequest,
    Partitioner, TextSplitter, TextSplitterError,
};
use crate::domain::{
    ExtractionResult, SourceFile, SplitterConfig, StoragePath, SupportedFileType, TextChunk,
    UnsupportedFileType,
};

pub const NEXT_DOCUMENT_DIVIDER: &str = "\n\n=== Next Document ===\n\n";

const SUCCESS_STATUS: u16 = 200;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub splitter: SplitterConfig,
    pub split_at_document_boundaries: bool,
    pub pdf_split_concurrency: u8,
    pub languages: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            splitter: SplitterConfig::default(),
            split_at_document_boundaries: true,
            pdf_split_concurrency: DEFAULT_PDF_SPLIT_CONCURRENCY,
            languages: vec!["eng".to_string()],
        }
    }
}

/// One successfully extracted file. The source bytes are kept so callers can
/// attach the original file to a model request.
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub file_name: String,
    pub file_type: SupportedFileType,
    pub data: Bytes,
    pub extraction: ExtractionResult,
    pub section: String,
}

#[derive(Debug, Clone)]
pub struct ProcessedBatch {
    pub files: Vec<ProcessedFile>,
    pub combined_text: String,
    pub chunks: Vec<TextChunk>,
}

pub struct DocumentPipeline {
    partitioner: Arc<dyn Partitioner>,
    blob_store: Arc<dyn BlobStore>,
    text_splitter: Arc<dyn TextSplitter>,
    settings: PipelineSettings,
}

impl DocumentPipeline {
    pub fn new(
        partitioner: Arc<dyn Partitioner>,
        blob_store: Arc<dyn BlobStore>,
        text_splitter: Arc<dyn TextSplitter>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            partitioner,
            blob_store,
            text_splitter,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Partitions and normalizes a single file. A non-200 status or an empty
    /// element list fails the file; there is no partial extraction.
    #[tracing::instrument(skip(self, file), fields(file_name = %file.file_name, size = file.data.len()))]
    pub async fn extract(&self, file: &SourceFile) -> Result<ProcessedFile, PipelineError> {
        let file_type = resolve_file_type(file)?;
        let options = PartitionOptions::for_file_type(file_type, self.settings.pdf_split_concurrency)
            .with_languages(self.settings.languages.clone());

        let response = self
            .partitioner
            .partition(PartitionRequest {
                file_name: &file.file_name,
                data: &file.data,
                options,
            })
            .await
            .map_err(|e| PipelineError::ExtractionFailed {
                file_name: file.file_name.clone(),
                reason: e.to_string(),
            })?;

        if response.status_code != SUCCESS_STATUS {
            tracing::warn!(status = response.status_code, "Partitioning returned non-success status");
            return Err(PipelineError::ExtractionFailed {
                file_name: file.file_name.clone(),
                reason: format!("partitioning service returned status {}", response.status_code),
            });
        }

        let elements = match response.elements {
            Some(elements) if !elements.is_empty() => elements,
            _ => {
                return Err(PipelineError::ExtractionFailed {
                    file_name: file.file_name.clone(),
                    reason: "partitioning service returned no elements".to_string(),
                });
            }
        };

        let extraction = ExtractionResult::normalize(&elements, file_type, &file.file_name);
        let section = extraction.document_section();

        tracing::debug!(
            elements = extraction.elements.len(),
            file_type = %file_type,
            "File extracted"
        );

        Ok(ProcessedFile {
            file_name: file.file_name.clone(),
            file_type,
            data: file.data.clone(),
            extraction,
            section,
        })
    }

    /// Extracts every file concurrently. Types are checked up front so an
    /// unsupported file never costs a network call, and the first failure
    /// aborts the batch. Output order matches input order.
    pub async fn extract_all(&self, files: &[SourceFile]) -> Result<Vec<ProcessedFile>, PipelineError> {
        for file in files {
            resolve_file_type(file)?;
        }
        try_join_all(files.iter().map(|file| self.extract(file))).await
    }

    #[tracing::instrument(skip(self, files), fields(file_count = files.len()))]
    pub async fn process(&self, files: &[SourceFile]) -> Result<ProcessedBatch, PipelineError> {
        self.settings.splitter.validate().map_err(TextSplitterError::from)?;

        let processed = self.extract_all(files).await?;
        let combined_text = combine_sections(&processed);
        let chunks = self.chunk(&processed, &combined_text)?;

        tracing::info!(
            files = processed.len(),
            chunks = chunks.len(),
            "Batch processed"
        );

        Ok(ProcessedBatch {
            files: processed,
            combined_text,
            chunks,
        })
    }

    /// Like [`process`](Self::process), but drops every in-flight extraction
    /// once `signal` resolves.
    pub async fn process_until<S>(
        &self,
        files: &[SourceFile],
        signal: S,
    ) -> Result<ProcessedBatch, PipelineError>
    where
        S: Future<Output = ()>,
    {
        tokio::select! {
            result = self.process(files) => result,
            _ = signal => {
                tracing::warn!("Processing cancelled");
                Err(PipelineError::Cancelled)
            }
        }
    }

    #[tracing::instrument(skip(self, paths), fields(path_count = paths.len()))]
    pub async fn fetch(&self, paths: &[StoragePath]) -> Result<Vec<SourceFile>, PipelineError> {
        try_join_all(paths.iter().map(|path| async move {
            let data = self
                .blob_store
                .download(path)
                .await
                .map_err(|source| PipelineError::DownloadFailed {
                    path: path.to_string(),
                    source,
                })?;
            Ok::<_, PipelineError>(SourceFile::new(path.file_name(), data))
        }))
        .await
    }

    pub async fn process_stored(&self, paths: &[StoragePath]) -> Result<ProcessedBatch, PipelineError> {
        let files = self.fetch(paths).await?;
        self.process(&files).await
    }

    /// Splits per document section unless boundary splitting is turned off,
    /// in which case the combined text is split as one blob.
    pub fn chunk(
        &self,
        files: &[ProcessedFile],
        combined_text: &str,
    ) -> Result<Vec<TextChunk>, PipelineError> {
        let config = &self.settings.splitter;
        if !self.settings.split_at_document_boundaries {
            return Ok(self.text_splitter.split(combined_text, config)?);
        }

        let mut chunks = Vec::new();
        for file in files {
            for chunk in self.text_splitter.split(&file.section, config)? {
                chunks.push(TextChunk::new(chunks.len(), chunk.text, chunk.token_count));
            }
        }
        Ok(chunks)
    }
}

pub fn combine_sections(files: &[ProcessedFile]) -> String {
    files
        .iter()
        .map(|f| f.section.as_str())
        .collect::<Vec<_>>()
        .join(NEXT_DOCUMENT_DIVIDER)
}

fn resolve_file_type(file: &SourceFile) -> Result<SupportedFileType, PipelineError> {
    SupportedFileType::from_file_name(&file.file_name).map_err(|source| {
        PipelineError::UnsupportedFileType {
            file_name: file.file_name.clone(),
            source,
        }
    })
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{file_name}: {source}")]
    UnsupportedFileType {
        file_name: String,
        source: UnsupportedFileType,
    },
    #[error("failed to extract text from {file_name}: {reason}")]
    ExtractionFailed { file_name: String, reason: String },
    #[error("failed to download {path}: {source}")]
    DownloadFailed {
        path: String,
        source: BlobStoreError,
    },
    #[error("configuration: {0}")]
    Configuration(#[from] TextSplitterError),
    #[error("processing cancelled")]
    Cancelled,
}

impl PipelineError {
    /// The file or path the failure is attributed to, when there is one.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            PipelineError::UnsupportedFileType { file_name, .. } => Some(file_name),
            PipelineError::ExtractionFailed { file_name, .. } => Some(file_name),
            PipelineError::DownloadFailed { path, .. } => Some(path),
            PipelineError::Configuration(_) | PipelineError::Cancelled => None,
        }
    }
}
