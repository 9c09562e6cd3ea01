use serde::{Deserialize, Serialize};

use super::SupportedFileType;

pub const UNKNOWN: &str = "unknown";

/// Element as returned by the partitioning service, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: RawElementMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawElementMetadata {
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub sheet_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cell_format: Option<serde_json::Value>,
    #[serde(default)]
    pub style_name: Option<String>,
}

impl RawElement {
    pub fn new(element_type: &str, text: &str) -> Self {
        Self {
            element_type: Some(element_type.to_string()),
            text: Some(text.to_string()),
            metadata: RawElementMetadata::default(),
        }
    }

    pub fn on_page(mut self, page_number: u32) -> Self {
        self.metadata.page_number = Some(page_number);
        self
    }

    pub fn in_sheet(mut self, sheet_name: &str) -> Self {
        self.metadata.sheet_name = Some(sheet_name.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.metadata.category = Some(category.to_string());
        self
    }
}

/// One normalized unit of extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedElement {
    pub element_type: String,
    pub text: String,
    pub location: LocationMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMetadata {
    pub page_number: Option<u32>,
    pub sheet_name: Option<String>,
    pub category: String,
    pub has_cell_format: bool,
    pub has_style_name: bool,
}

impl ExtractedElement {
    /// `[File: <name>, Sheet: <sheet>]` for spreadsheets, `[File: <name>, Page: <page>]` otherwise.
    pub fn location_label(&self, file_type: SupportedFileType, file_name: &str) -> String {
        if file_type.is_spreadsheet() {
            let sheet = self.location.sheet_name.as_deref().unwrap_or(UNKNOWN);
            format!("[File: {}, Sheet: {}]", file_name, sheet)
        } else {
            let page = self
                .location
                .page_number
                .map(|p| p.to_string())
                .unwrap_or_else(|| UNKNOWN.to_string());
            format!("[File: {}, Page: {}]", file_name, page)
        }
    }

    pub fn format_line(&self, file_type: SupportedFileType, file_name: &str) -> String {
        format!(
            "{} [{}]: {}",
            self.location_label(file_type, file_name),
            self.location.category,
            self.text
        )
    }
}
