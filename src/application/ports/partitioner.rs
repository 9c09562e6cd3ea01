use async_trait::async_trait;

use crate::domain::{RawElement, SupportedFileType};

/// Converts raw file bytes into typed, positioned text elements.
#[async_trait]
pub trait Partitioner: Send + Sync {
    async fn partition(
        &self,
        request: PartitionRequest<'_>,
    ) -> Result<PartitionResponse, PartitionerError>;
}

pub struct PartitionRequest<'a> {
    pub file_name: &'a str,
    pub data: &'a [u8],
    pub options: PartitionOptions,
}

/// A non-200 status or a missing element list fails the file; interpreting
/// that is left to the caller so it can name the file.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionResponse {
    pub status_code: u16,
    pub elements: Option<Vec<RawElement>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// Layout model plus OCR.
    HiRes,
}

impl PartitionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionStrategy::HiRes => "hi_res",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOptions {
    pub strategy: PartitionStrategy,
    pub languages: Vec<String>,
    pub preserve_formulas: bool,
    pub extract_cell_formats: bool,
    pub preserve_formatting: bool,
    pub extract_images: bool,
    pub include_header_footer: bool,
    pub split_pdf_page: bool,
    pub split_pdf_allow_failed: bool,
    pub split_pdf_concurrency_level: Option<u8>,
}

pub const DEFAULT_PDF_SPLIT_CONCURRENCY: u8 = 15;

impl PartitionOptions {
    /// Format-specific options: formulas and cell formats for spreadsheets,
    /// formatting and images for word-processor files, page splitting for PDFs.
    pub fn for_file_type(file_type: SupportedFileType, pdf_split_concurrency: u8) -> Self {
        let base = Self {
            strategy: PartitionStrategy::HiRes,
            languages: vec!["eng".to_string()],
            preserve_formulas: false,
            extract_cell_formats: false,
            preserve_formatting: false,
            extract_images: false,
            include_header_footer: false,
            split_pdf_page: false,
            split_pdf_allow_failed: false,
            split_pdf_concurrency_level: None,
        };

        match file_type {
            SupportedFileType::Pdf => Self {
                split_pdf_page: true,
                split_pdf_allow_failed: true,
                split_pdf_concurrency_level: Some(pdf_split_concurrency),
                ..base
            },
            SupportedFileType::Xlsx => Self {
                preserve_formulas: true,
                extract_cell_formats: true,
                include_header_footer: true,
                ..base
            },
            SupportedFileType::Docx => Self {
                preserve_formatting: true,
                extract_images: true,
                include_header_footer: true,
                ..base
            },
            SupportedFileType::Pptx => base,
        }
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PartitionerError {
    #[error("partition request failed: {0}")]
    RequestFailed(String),
    #[error("invalid partition response: {0}")]
    InvalidResponse(String),
}
