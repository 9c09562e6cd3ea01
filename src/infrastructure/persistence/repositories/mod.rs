mod in_memory_repository;
mod pg_analysis_repository;
mod pg_document_repository;

pub use in_memory_repository::{InMemoryAnalysisRepository, InMemoryDocumentRepository};
pub use pg_analysis_repository::PgAnalysisRepository;
pub use pg_document_repository::PgDocumentRepository;
