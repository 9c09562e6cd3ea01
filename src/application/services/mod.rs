pub mod analysis_prompt;
mod analysis_service;
mod document_pipeline;
mod file_validation;
pub mod intake_prompt;
mod intake_service;
mod token_counter;

pub use analysis_service::{
    AnalysisEvent, AnalysisEventStream, AnalysisService, AnalysisServiceError, NewAnalysis,
};
pub use document_pipeline::{
    DocumentPipeline, NEXT_DOCUMENT_DIVIDER, PipelineError, PipelineSettings, ProcessedBatch,
    ProcessedFile, combine_sections,
};
pub use file_validation::{DEFAULT_MAX_FILE_SIZE, FileValidator, ValidationError};
pub use intake_service::{DocumentIntakeService, IntakeError, IntakeOutcome, IntakeRequest};
pub use token_counter::{Cl100kTokenCounter, count_tokens, estimate_token_count};
