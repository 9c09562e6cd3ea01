use std::pin::Pin;
use std::sync::Arc;

use futures::future::try_join_all;
use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::application::ports::{
    AnalysisRepository, GeneratorError, RepositoryError, StructuredGenerator,
};
use crate::domain::{
    Analysis, AnalysisId, AnalysisReport, CompanyId, DocumentId, DocumentType, InvalidTransition,
    SourceFile, StoragePath, TextChunk, UserId,
};

use super::analysis_prompt::build_request;
use super::{DocumentPipeline, PipelineError, ProcessedBatch};

const EVENT_BUFFER: usize = 32;

pub struct NewAnalysis {
    pub company_id: CompanyId,
    pub analyzer_id: UserId,
    pub document_ids: Vec<DocumentId>,
    pub document_type: DocumentType,
    pub title: String,
}

#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// A progressively more complete report for one chunk.
    Partial {
        chunk_index: usize,
        total_chunks: usize,
        snapshot: Value,
    },
    Finished(Analysis),
}

pub type AnalysisEventStream =
    Pin<Box<dyn Stream<Item = Result<AnalysisEvent, AnalysisServiceError>> + Send + 'static>>;

pub struct AnalysisService {
    pipeline: Arc<DocumentPipeline>,
    generator: Arc<dyn StructuredGenerator>,
    analyses: Arc<dyn AnalysisRepository>,
}

impl AnalysisService {
    pub fn new(
        pipeline: Arc<DocumentPipeline>,
        generator: Arc<dyn StructuredGenerator>,
        analyses: Arc<dyn AnalysisRepository>,
    ) -> Self {
        Self {
            pipeline,
            generator,
            analyses,
        }
    }

    #[tracing::instrument(skip(self, request), fields(company_id = %request.company_id))]
    pub async fn create(&self, request: NewAnalysis) -> Result<Analysis, AnalysisServiceError> {
        let analysis = Analysis::new(
            request.company_id,
            request.analyzer_id,
            request.document_ids,
            request.document_type,
            request.title,
        );
        self.analyses.create(&analysis).await?;
        tracing::info!(analysis_id = %analysis.id, "Analysis created");
        Ok(analysis)
    }

    pub async fn get(&self, id: AnalysisId) -> Result<Analysis, AnalysisServiceError> {
        self.analyses
            .get_by_id(id)
            .await?
            .ok_or(AnalysisServiceError::NotFound(id))
    }

    /// Runs a pending analysis to a terminal or review state. Any failure after
    /// the analysis has started is recorded on it before being returned.
    #[tracing::instrument(skip(self, files, prompt), fields(analysis_id = %id, file_count = files.len()))]
    pub async fn run(
        &self,
        id: AnalysisId,
        files: Vec<SourceFile>,
        prompt: Option<String>,
    ) -> Result<Analysis, AnalysisServiceError> {
        let mut analysis = self.begin(id).await?;
        let outcome = self.analyze(&analysis, &files, prompt.as_deref()).await;
        self.settle(&mut analysis, outcome).await?;
        Ok(analysis)
    }

    /// Same as [`run`](Self::run) for files already in the blob store.
    pub async fn run_stored(
        &self,
        id: AnalysisId,
        paths: &[StoragePath],
        prompt: Option<String>,
    ) -> Result<Analysis, AnalysisServiceError> {
        let mut analysis = self.begin(id).await?;
        let outcome = match self.pipeline.fetch(paths).await {
            Ok(files) => self.analyze(&analysis, &files, prompt.as_deref()).await,
            Err(e) => Err(e.into()),
        };
        self.settle(&mut analysis, outcome).await?;
        Ok(analysis)
    }

    /// Streams partial reports while the analysis runs. The analysis is started
    /// before the stream is returned; dropping the stream stops the run and
    /// leaves whatever was persisted in place.
    pub async fn run_streaming(
        self: Arc<Self>,
        id: AnalysisId,
        files: Vec<SourceFile>,
        prompt: Option<String>,
    ) -> Result<AnalysisEventStream, AnalysisServiceError> {
        let mut analysis = self.begin(id).await?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        tokio::spawn(async move {
            let outcome = self
                .analyze_streaming(&analysis, &files, prompt.as_deref(), &tx)
                .await;

            if matches!(outcome, Err(AnalysisServiceError::Abandoned)) {
                tracing::warn!(analysis_id = %analysis.id, "Analysis stream abandoned by consumer");
                return;
            }

            let event = match self.settle(&mut analysis, outcome).await {
                Ok(()) => Ok(AnalysisEvent::Finished(analysis)),
                Err(e) => Err(e),
            };
            let _ = tx.send(event).await;
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            let event = rx.recv().await?;
            Some((event, rx))
        })))
    }

    async fn begin(&self, id: AnalysisId) -> Result<Analysis, AnalysisServiceError> {
        let mut analysis = self.get(id).await?;
        analysis.start()?;
        self.analyses.update(&analysis).await?;
        tracing::info!(analysis_id = %id, "Analysis started");
        Ok(analysis)
    }

    async fn settle(
        &self,
        analysis: &mut Analysis,
        outcome: Result<(AnalysisReport, Value), AnalysisServiceError>,
    ) -> Result<(), AnalysisServiceError> {
        match outcome {
            Ok((report, metadata)) => {
                let started = analysis.clone();
                analysis.metadata = metadata;
                analysis.finish(report)?;
                if let Err(e) = self.analyses.update(analysis).await {
                    tracing::error!(
                        analysis_id = %analysis.id,
                        error = %e,
                        "Failed to store finished analysis"
                    );
                    *analysis = started;
                    analysis.fail(format!("failed to store report: {}", e))?;
                    if let Err(fallback) = self.analyses.update(analysis).await {
                        tracing::warn!(
                            analysis_id = %analysis.id,
                            error = %fallback,
                            "Stored analysis status is stale"
                        );
                    }
                    return Err(e.into());
                }
                tracing::info!(
                    analysis_id = %analysis.id,
                    status = %analysis.status,
                    findings = analysis.findings.len(),
                    "Analysis finished"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(analysis_id = %analysis.id, error = %e, "Analysis failed");
                analysis.fail(e.to_string())?;
                self.analyses.update(analysis).await?;
                Err(e)
            }
        }
    }

    async fn analyze(
        &self,
        analysis: &Analysis,
        files: &[SourceFile],
        prompt: Option<&str>,
    ) -> Result<(AnalysisReport, Value), AnalysisServiceError> {
        let batch = self.pipeline.process(files).await?;
        let total = batch.chunks.len();

        let reports = try_join_all(batch.chunks.iter().map(|chunk| {
            let request = build_request(analysis.document_type, prompt, chunk, total, &batch.files);
            async move {
                let value = self.generator.generate(&request).await?;
                parse_report(value, chunk)
            }
        }))
        .await?;

        Ok((AnalysisReport::merge(reports), batch_metadata(&batch)))
    }

    async fn analyze_streaming(
        &self,
        analysis: &Analysis,
        files: &[SourceFile],
        prompt: Option<&str>,
        tx: &mpsc::Sender<Result<AnalysisEvent, AnalysisServiceError>>,
    ) -> Result<(AnalysisReport, Value), AnalysisServiceError> {
        let batch = self.pipeline.process(files).await?;
        let total = batch.chunks.len();
        let mut reports = Vec::with_capacity(total);

        for chunk in &batch.chunks {
            let request = build_request(analysis.document_type, prompt, chunk, total, &batch.files);
            let mut snapshots = self.generator.generate_stream(&request).await?;
            let mut last = None;

            while let Some(snapshot) = snapshots.next().await {
                let snapshot = snapshot?;
                let event = AnalysisEvent::Partial {
                    chunk_index: chunk.index,
                    total_chunks: total,
                    snapshot: snapshot.clone(),
                };
                if tx.send(Ok(event)).await.is_err() {
                    return Err(AnalysisServiceError::Abandoned);
                }
                last = Some(snapshot);
            }

            let value = last.ok_or_else(|| {
                AnalysisServiceError::InvalidPayload(format!(
                    "part {} produced no output",
                    chunk.index + 1
                ))
            })?;
            reports.push(parse_report(value, chunk)?);
        }

        Ok((AnalysisReport::merge(reports), batch_metadata(&batch)))
    }
}

fn parse_report(value: Value, chunk: &TextChunk) -> Result<AnalysisReport, AnalysisServiceError> {
    serde_json::from_value(value).map_err(|e| {
        AnalysisServiceError::InvalidPayload(format!("part {}: {}", chunk.index + 1, e))
    })
}

fn batch_metadata(batch: &ProcessedBatch) -> Value {
    json!({
        "documents": batch
            .files
            .iter()
            .map(|f| f.extraction.metadata.to_json())
            .collect::<Vec<_>>(),
        "chunkCount": batch.chunks.len(),
        "totalTokens": batch.chunks.iter().map(|c| c.token_count).sum::<usize>(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisServiceError {
    #[error("analysis not found: {0}")]
    NotFound(AnalysisId),
    #[error("document processing: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("generation: {0}")]
    Generation(#[from] GeneratorError),
    #[error("invalid analysis payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("analysis stream abandoned")]
    Abandoned,
}
