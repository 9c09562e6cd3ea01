use crate::domain::{SourceFile, SupportedFileType};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File size exceeds maximum allowed size of {max_mb}MB")]
    TooLarge { size: u64, max_mb: u64 },
    #[error("Unsupported file type: {extension}. Supported types: {supported}")]
    UnsupportedType { extension: String, supported: String },
    #[error("Unsupported MIME type: {0}")]
    UnsupportedMime(String),
}

/// Size and type gate applied before any bytes leave the process.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_size: u64,
    allowed_types: Vec<SupportedFileType>,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl FileValidator {
    pub fn new(max_size: u64) -> Self {
        Self {
            max_size,
            allowed_types: SupportedFileType::ALL.to_vec(),
        }
    }

    pub fn with_allowed_types(mut self, allowed_types: Vec<SupportedFileType>) -> Self {
        self.allowed_types = allowed_types;
        self
    }

    pub fn validate(&self, file: &SourceFile) -> Result<SupportedFileType, ValidationError> {
        if file.size_bytes() > self.max_size {
            return Err(ValidationError::TooLarge {
                size: file.size_bytes(),
                max_mb: self.max_size / BYTES_PER_MB,
            });
        }

        let extension = file
            .file_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match SupportedFileType::from_file_name(&file.file_name) {
            Ok(file_type) if self.allowed_types.contains(&file_type) => Ok(file_type),
            _ => Err(ValidationError::UnsupportedType {
                extension,
                supported: self
                    .allowed_types
                    .iter()
                    .map(|t| t.as_extension())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    pub fn validate_mime(&self, mime: &str) -> Result<SupportedFileType, ValidationError> {
        SupportedFileType::from_mime(mime)
            .filter(|t| self.allowed_types.contains(t))
            .ok_or_else(|| ValidationError::UnsupportedMime(mime.to_string()))
    }
}
