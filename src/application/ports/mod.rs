mod analysis_repository;
mod blob_store;
mod document_repository;
mod partitioner;
mod repository_error;
mod structured_generator;
mod text_splitter;
mod token_counter;

pub use analysis_repository::AnalysisRepository;
pub use blob_store::{BlobStore, BlobStoreError, UploadOptions};
pub use document_repository::DocumentRepository;
pub use partitioner::{
    DEFAULT_PDF_SPLIT_CONCURRENCY, PartitionOptions, PartitionRequest, PartitionResponse,
    PartitionStrategy, Partitioner, PartitionerError,
};
pub use repository_error::RepositoryError;
pub use structured_generator::{
    GenerationMessage, GenerationRequest, GeneratorError, MessagePart, MessageRole,
    PartialObjectStream, StructuredGenerator,
};
pub use text_splitter::{TextSplitter, TextSplitterError};
pub use token_counter::TokenCounter;
