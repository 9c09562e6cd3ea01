mod analysis;
mod analysis_status;
mod document;
mod extracted_element;
mod extraction_result;
mod file_type;
mod ids;
mod storage_path;
mod text_chunk;

pub use analysis::{Analysis, AnalysisReport, Finding, FindingKind, FindingStatus, Severity};
pub use analysis_status::{AnalysisStatus, InvalidTransition};
pub use document::{DocumentRecord, DocumentStatus, DocumentType, SourceFile};
pub use extracted_element::{ExtractedElement, LocationMetadata, RawElement, RawElementMetadata};
pub use extraction_result::{ExtractionMetadata, ExtractionResult, FormatMetadata};
pub use file_type::{SupportedFileType, UnsupportedFileType};
pub use ids::{AnalysisId, CompanyId, DocumentId, UserId};
pub use storage_path::{StoragePath, sanitize_file_name};
pub use text_chunk::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, SplitterConfig, SplitterConfigError, TextChunk,
    default_separators,
};
