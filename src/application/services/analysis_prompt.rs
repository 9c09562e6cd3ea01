use serde_json::{Value, json};

use crate::application::ports::{GenerationMessage, GenerationRequest, MessagePart};
use crate::domain::{DocumentType, TextChunk};

use super::ProcessedFile;

pub const REPORT_SCHEMA_NAME: &str = "board_document_analysis";

const SYSTEM_PROMPT: &str = "You are an expert board document analyzer. \
Extract and understand the document content, analyze it for inconsistencies and issues, \
check compliance with policies and submit structured findings. \
Cite the [File: ..., Page: ...] or [File: ..., Sheet: ...] label of the content a finding refers to in its location. \
Be thorough and precise. Require human confirmation for critical issues. \
Provide clear, actionable findings.";

const GENERAL_FOCUS: &[&str] = &[
    "Financial accuracy and consistency",
    "Policy compliance",
    "Risk identification",
    "Action item tracking",
    "Missing information",
];

pub fn focus_areas(document_type: DocumentType) -> &'static [&'static str] {
    match document_type {
        DocumentType::Financial => &[
            "Financial accuracy and consistency",
            "Variances against budget or prior periods",
            "Unexplained adjustments or restatements",
            "Liquidity and solvency indicators",
            "Missing information",
        ],
        DocumentType::Governance => &[
            "Board composition and independence",
            "Delegation of authority",
            "Conflicts of interest",
            "Policy compliance",
            "Missing information",
        ],
        DocumentType::Compliance => &[
            "Regulatory obligations and deadlines",
            "Policy compliance",
            "Breaches and remediation status",
            "Missing information",
        ],
        DocumentType::Risk => &[
            "Risk identification",
            "Risk ratings and appetite",
            "Mitigation ownership and timelines",
            "Missing information",
        ],
        DocumentType::Strategy => &[
            "Consistency of objectives and targets",
            "Resourcing and financial assumptions",
            "Risk identification",
            "Action item tracking",
        ],
        DocumentType::Minutes => &[
            "Decisions and resolutions recorded",
            "Action item tracking",
            "Quorum and attendance",
            "Conflicts of interest",
        ],
        DocumentType::Policy => &[
            "Policy compliance",
            "Review dates and ownership",
            "Gaps against regulatory obligations",
            "Missing information",
        ],
        DocumentType::Report | DocumentType::Other => GENERAL_FOCUS,
    }
}

pub fn system_instructions(document_type: DocumentType) -> String {
    let focus = focus_areas(document_type)
        .iter()
        .map(|area| format!("- {}", area))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\nFocus on:\n{}", SYSTEM_PROMPT, focus)
}

/// JSON schema for one chunk's structured report.
pub fn report_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "executiveSummary": { "type": "string" },
            "keyFindings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": {
                            "type": "string",
                            "enum": [
                                "inconsistency",
                                "missing_information",
                                "compliance_issue",
                                "financial_discrepancy",
                                "risk_flag",
                                "action_required",
                                "policy_violation"
                            ]
                        },
                        "severity": {
                            "type": "string",
                            "enum": ["info", "low", "medium", "high", "critical"]
                        },
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "location": { "type": "string" },
                        "context": { "type": "string" },
                        "suggestedAction": { "type": "string" },
                        "status": { "type": "string", "enum": ["open"] }
                    },
                    "required": ["type", "severity", "title", "description"]
                }
            },
            "recommendations": { "type": "array", "items": { "type": "string" } },
            "requiresHumanReview": { "type": "boolean" }
        },
        "required": ["executiveSummary", "keyFindings", "recommendations", "requiresHumanReview"]
    })
}

/// Builds the request for one chunk. Source files are attached only to the
/// first part so multi-part runs do not resend the same bytes.
pub fn build_request(
    document_type: DocumentType,
    prompt: Option<&str>,
    chunk: &TextChunk,
    total_chunks: usize,
    attachments: &[ProcessedFile],
) -> GenerationRequest {
    let mut parts = Vec::new();
    if chunk.index == 0 {
        parts.extend(attachments.iter().map(|file| MessagePart::File {
            file_name: file.file_name.clone(),
            mime_type: file.file_type.as_mime().to_string(),
            data: file.data.clone(),
        }));
    }

    let mut text = String::new();
    if let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) {
        text.push_str(prompt);
        text.push_str("\n\n");
    }
    if total_chunks > 1 {
        text.push_str(&format!(
            "Part {} of {}. Analyze this part on its own; the other parts are analyzed separately.\n\n",
            chunk.index + 1,
            total_chunks
        ));
    }
    text.push_str("Analyze the following documents together:\n");
    text.push_str(&chunk.text);
    parts.push(MessagePart::Text(text));

    GenerationRequest {
        schema_name: REPORT_SCHEMA_NAME.to_string(),
        schema: report_schema(),
        messages: vec![
            GenerationMessage::system(system_instructions(document_type)),
            GenerationMessage::user(parts),
        ],
    }
}
