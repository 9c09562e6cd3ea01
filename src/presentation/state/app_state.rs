use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{
    AnalysisRepository, BlobStoreError, DocumentRepository, GeneratorError, PartitionerError,
    RepositoryError, StructuredGenerator,
};
use crate::application::services::{
    AnalysisService, DocumentIntakeService, DocumentPipeline, FileValidator,
};
use crate::infrastructure::llm::{LlmAuthScheme, StructuredLlmClient, StructuredLlmConfig};
use crate::infrastructure::partitioning::UnstructuredClient;
use crate::infrastructure::persistence::{
    InMemoryAnalysisRepository, InMemoryDocumentRepository, PgAnalysisRepository,
    PgDocumentRepository, create_pool,
};
use crate::infrastructure::storage::BlobStoreFactory;
use crate::infrastructure::text_processing::RecursiveTextSplitter;
use crate::presentation::config::{LlmProviderSetting, Settings};

/// Process-wide service graph. Every client handle is constructed once here
/// and shared by reference.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DocumentPipeline>,
    pub intake_service: Arc<DocumentIntakeService>,
    /// `None` when no LLM api key is configured.
    pub analysis_service: Option<Arc<AnalysisService>>,
    pub analysis_repository: Arc<dyn AnalysisRepository>,
    pub document_repository: Arc<dyn DocumentRepository>,
    pub settings: Settings,
}

impl AppState {
    pub async fn from_settings(settings: Settings) -> Result<Self, AppStateError> {
        let partitioner = Arc::new(UnstructuredClient::new(
            &settings.partitioning.base_url,
            settings.partitioning.api_key.clone(),
            Duration::from_secs(settings.partitioning.timeout_secs),
        )?);
        let blob_store = BlobStoreFactory::create(&settings.storage)?;
        let text_splitter = Arc::new(RecursiveTextSplitter::default());

        let pipeline = Arc::new(DocumentPipeline::new(
            partitioner,
            Arc::clone(&blob_store),
            text_splitter,
            settings.pipeline_settings(),
        ));

        let (analysis_repository, document_repository): (
            Arc<dyn AnalysisRepository>,
            Arc<dyn DocumentRepository>,
        ) = match settings.database.url.as_deref() {
            Some(url) => {
                let pool = create_pool(url, settings.database.max_connections).await?;
                (
                    Arc::new(PgAnalysisRepository::new(pool.clone())),
                    Arc::new(PgDocumentRepository::new(pool)),
                )
            }
            None => {
                tracing::warn!("No database configured, records are kept in memory");
                (
                    Arc::new(InMemoryAnalysisRepository::new()),
                    Arc::new(InMemoryDocumentRepository::new()),
                )
            }
        };

        let generator: Option<Arc<dyn StructuredGenerator>> =
            match settings.llm.api_key.as_deref().filter(|k| !k.is_empty()) {
                Some(api_key) => Some(Arc::new(StructuredLlmClient::new(StructuredLlmConfig {
                    base_url: settings.llm.base_url.clone(),
                    api_key: api_key.to_string(),
                    model: settings.llm.model.clone(),
                    max_tokens: settings.llm.max_tokens,
                    temperature: settings.llm.temperature,
                    timeout: Duration::from_secs(settings.llm.timeout_secs),
                    auth: match settings.llm.provider {
                        LlmProviderSetting::OpenAi => LlmAuthScheme::Bearer,
                        LlmProviderSetting::Azure => LlmAuthScheme::ApiKeyHeader,
                    },
                })?)),
                None => {
                    tracing::info!("No LLM api key configured, analysis is disabled");
                    None
                }
            };

        let mut intake_service = DocumentIntakeService::new(
            Arc::clone(&pipeline),
            blob_store,
            Arc::clone(&document_repository),
            FileValidator::new(settings.intake.max_file_size_bytes()),
        );
        if let Some(generator) = generator.as_ref().filter(|_| settings.intake.generate_metadata) {
            intake_service = intake_service.with_generator(Arc::clone(generator));
        }
        let intake_service = Arc::new(intake_service);

        let analysis_service = generator.map(|generator| {
            Arc::new(AnalysisService::new(
                Arc::clone(&pipeline),
                generator,
                Arc::clone(&analysis_repository),
            ))
        });

        Ok(Self {
            pipeline,
            intake_service,
            analysis_service,
            analysis_repository,
            document_repository,
            settings,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("partitioning client: {0}")]
    Partitioner(#[from] PartitionerError),
    #[error("blob store: {0}")]
    BlobStore(#[from] BlobStoreError),
    #[error("record store: {0}")]
    Repository(#[from] RepositoryError),
    #[error("llm client: {0}")]
    Generator(#[from] GeneratorError),
}
