use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DocumentType;

/// Source formats the partitioning service is asked to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedFileType {
    Pdf,
    Xlsx,
    Docx,
    Pptx,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported file type: {extension}")]
pub struct UnsupportedFileType {
    pub extension: String,
}

impl SupportedFileType {
    pub const ALL: [SupportedFileType; 4] = [Self::Pdf, Self::Xlsx, Self::Docx, Self::Pptx];

    /// Resolves the type from the text after the last `.` of a file name.
    /// A name without a dot is treated as its own extension and rejected.
    pub fn from_file_name(file_name: &str) -> Result<Self, UnsupportedFileType> {
        let extension = file_name.rsplit('.').next().unwrap_or_default();
        extension.parse()
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/pdf" => Some(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some(Self::Xlsx),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Some(Self::Pptx)
            }
            _ => None,
        }
    }

    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }

    pub fn as_extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
        }
    }

    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, Self::Xlsx)
    }

    /// Category a freshly uploaded file is filed under.
    pub fn default_document_type(&self) -> DocumentType {
        match self {
            Self::Xlsx => DocumentType::Financial,
            Self::Pdf | Self::Docx | Self::Pptx => DocumentType::Report,
        }
    }
}

impl FromStr for SupportedFileType {
    type Err = UnsupportedFileType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "xlsx" => Ok(Self::Xlsx),
            "docx" => Ok(Self::Docx),
            "pptx" => Ok(Self::Pptx),
            _ => Err(UnsupportedFileType {
                extension: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SupportedFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_extension())
    }
}
