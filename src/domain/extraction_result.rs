use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::extracted_element::UNKNOWN;
use super::{ExtractedElement, LocationMetadata, RawElement, SupportedFileType};

pub const TABLE_ELEMENT_TYPE: &str = "table";

/// Aggregate over all normalized elements of one file, in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub elements: Vec<ExtractedElement>,
    pub metadata: ExtractionMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub file_type: SupportedFileType,
    pub file_name: String,
    pub format: FormatMetadata,
}

/// Fields that only exist for some formats. A field missing from a variant means
/// "not applicable", which is different from a zero count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FormatMetadata {
    #[serde(rename_all = "camelCase")]
    Pdf { total_pages: u32 },
    #[serde(rename_all = "camelCase")]
    Spreadsheet {
        total_sheets: usize,
        total_tables: usize,
        has_cell_formatting: bool,
    },
    #[serde(rename_all = "camelCase")]
    WordProcessor {
        total_pages: u32,
        has_style_formatting: bool,
    },
    Presentation,
}

impl ExtractionResult {
    /// Pure function of its inputs: the same elements always normalize to the same result.
    pub fn normalize(
        raw_elements: &[RawElement],
        file_type: SupportedFileType,
        file_name: &str,
    ) -> Self {
        let elements: Vec<ExtractedElement> = raw_elements
            .iter()
            .map(|raw| normalize_element(raw, file_type))
            .collect();

        let format = match file_type {
            SupportedFileType::Pdf => FormatMetadata::Pdf {
                total_pages: max_page(&elements),
            },
            SupportedFileType::Docx => FormatMetadata::WordProcessor {
                total_pages: max_page(&elements),
                has_style_formatting: elements.iter().any(|e| e.location.has_style_name),
            },
            SupportedFileType::Xlsx => FormatMetadata::Spreadsheet {
                total_sheets: elements
                    .iter()
                    .map(|e| e.location.sheet_name.as_deref().unwrap_or(UNKNOWN))
                    .collect::<BTreeSet<_>>()
                    .len(),
                total_tables: elements
                    .iter()
                    .filter(|e| e.element_type == TABLE_ELEMENT_TYPE)
                    .count(),
                has_cell_formatting: elements.iter().any(|e| e.location.has_cell_format),
            },
            SupportedFileType::Pptx => FormatMetadata::Presentation,
        };

        Self {
            elements,
            metadata: ExtractionMetadata {
                file_type,
                file_name: file_name.to_string(),
                format,
            },
        }
    }

    /// Element lines joined by blank lines; the provenance labels are what carry
    /// page/sheet references into the model context.
    pub fn formatted_text(&self) -> String {
        self.elements
            .iter()
            .map(|e| e.format_line(self.metadata.file_type, &self.metadata.file_name))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// `=== Document: <name> ===` framed section with a metadata line and content.
    pub fn document_section(&self) -> String {
        format!(
            "=== Document: {} ===\nMetadata: {}\n\nContent:\n{}",
            self.metadata.file_name,
            self.metadata.describe(),
            self.formatted_text()
        )
    }
}

impl ExtractionMetadata {
    pub fn total_pages(&self) -> Option<u32> {
        match self.format {
            FormatMetadata::Pdf { total_pages } => Some(total_pages),
            FormatMetadata::WordProcessor { total_pages, .. } => Some(total_pages),
            _ => None,
        }
    }

    pub fn total_sheets(&self) -> Option<usize> {
        match self.format {
            FormatMetadata::Spreadsheet { total_sheets, .. } => Some(total_sheets),
            _ => None,
        }
    }

    pub fn total_tables(&self) -> Option<usize> {
        match self.format {
            FormatMetadata::Spreadsheet { total_tables, .. } => Some(total_tables),
            _ => None,
        }
    }

    pub fn has_cell_formatting(&self) -> Option<bool> {
        match self.format {
            FormatMetadata::Spreadsheet {
                has_cell_formatting,
                ..
            } => Some(has_cell_formatting),
            _ => None,
        }
    }

    pub fn has_style_formatting(&self) -> Option<bool> {
        match self.format {
            FormatMetadata::WordProcessor {
                has_style_formatting,
                ..
            } => Some(has_style_formatting),
            _ => None,
        }
    }

    /// Populated fields only, in a stable order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("fileType", self.file_type.to_string()),
            ("fileName", self.file_name.clone()),
        ];
        if let Some(v) = self.total_pages() {
            fields.push(("totalPages", v.to_string()));
        }
        if let Some(v) = self.total_sheets() {
            fields.push(("totalSheets", v.to_string()));
        }
        if let Some(v) = self.total_tables() {
            fields.push(("totalTables", v.to_string()));
        }
        if let Some(v) = self.has_cell_formatting() {
            fields.push(("hasCellFormatting", v.to_string()));
        }
        if let Some(v) = self.has_style_formatting() {
            fields.push(("hasStyleFormatting", v.to_string()));
        }
        fields
    }

    pub fn describe(&self) -> String {
        self.fields()
            .into_iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Flat JSON object of the populated fields, numbers and flags kept typed.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("fileType".into(), self.file_type.to_string().into());
        map.insert("fileName".into(), self.file_name.clone().into());
        if let Some(v) = self.total_pages() {
            map.insert("totalPages".into(), v.into());
        }
        if let Some(v) = self.total_sheets() {
            map.insert("totalSheets".into(), v.into());
        }
        if let Some(v) = self.total_tables() {
            map.insert("totalTables".into(), v.into());
        }
        if let Some(v) = self.has_cell_formatting() {
            map.insert("hasCellFormatting".into(), v.into());
        }
        if let Some(v) = self.has_style_formatting() {
            map.insert("hasStyleFormatting".into(), v.into());
        }
        serde_json::Value::Object(map)
    }
}

fn normalize_element(raw: &RawElement, file_type: SupportedFileType) -> ExtractedElement {
    let meta = &raw.metadata;
    let location = LocationMetadata {
        page_number: meta.page_number.filter(|p| *p > 0),
        sheet_name: meta.sheet_name.clone().filter(|s| !s.is_empty()),
        category: meta
            .category
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        has_cell_format: meta.cell_format.as_ref().is_some_and(|v| !v.is_null()),
        has_style_name: meta.style_name.as_ref().is_some_and(|s| !s.is_empty()),
    };

    let text = raw.text.clone().unwrap_or_default();
    let text = if file_type.is_spreadsheet() {
        let sheet = location.sheet_name.as_deref().unwrap_or(UNKNOWN);
        format!("[Sheet: {}] {}", sheet, text)
    } else {
        text
    };

    ExtractedElement {
        element_type: raw
            .element_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        text,
        location,
    }
}

fn max_page(elements: &[ExtractedElement]) -> u32 {
    elements
        .iter()
        .filter_map(|e| e.location.page_number)
        .max()
        .unwrap_or(0)
}
