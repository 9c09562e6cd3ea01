use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnalysisId, AnalysisStatus, CompanyId, DocumentId, DocumentType, InvalidTransition, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Inconsistency,
    MissingInformation,
    ComplianceIssue,
    FinancialDiscrepancy,
    RiskFlag,
    ActionRequired,
    PolicyViolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Open,
    InReview,
    Accepted,
    Rejected,
    Resolved,
}

/// A finding as emitted by the model, and as stored against the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(default = "default_finding_status")]
    pub status: FindingStatus,
}

fn default_finding_status() -> FindingStatus {
    FindingStatus::Open
}

/// Structured payload the model must return for each chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub executive_summary: String,
    #[serde(default)]
    pub key_findings: Vec<Finding>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub requires_human_review: bool,
}

impl AnalysisReport {
    /// Folds per-chunk reports into one, keeping chunk order and dropping
    /// repeated recommendations.
    pub fn merge(reports: Vec<AnalysisReport>) -> AnalysisReport {
        let mut merged = AnalysisReport {
            executive_summary: String::new(),
            key_findings: Vec::new(),
            recommendations: Vec::new(),
            requires_human_review: false,
        };
        let mut summaries = Vec::with_capacity(reports.len());

        for report in reports {
            if !report.executive_summary.trim().is_empty() {
                summaries.push(report.executive_summary);
            }
            merged.key_findings.extend(report.key_findings);
            for recommendation in report.recommendations {
                if !merged.recommendations.contains(&recommendation) {
                    merged.recommendations.push(recommendation);
                }
            }
            merged.requires_human_review |= report.requires_human_review;
        }

        merged.executive_summary = summaries.join("\n\n");
        merged
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: AnalysisId,
    pub company_id: CompanyId,
    pub analyzer_id: UserId,
    pub document_ids: Vec<DocumentId>,
    pub document_type: DocumentType,
    pub title: String,
    pub status: AnalysisStatus,
    pub summary: Option<String>,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
    pub error_message: Option<String>,
    pub metadata: serde_json::Value,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Analysis {
    pub fn new(
        company_id: CompanyId,
        analyzer_id: UserId,
        document_ids: Vec<DocumentId>,
        document_type: DocumentType,
        title: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AnalysisId::new(),
            company_id,
            analyzer_id,
            document_ids,
            document_type,
            title,
            status: AnalysisStatus::Pending,
            summary: None,
            findings: Vec::new(),
            recommendations: Vec::new(),
            error_message: None,
            metadata: serde_json::Value::Null,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, next: AnalysisStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        self.transition(AnalysisStatus::InProgress)?;
        self.started_at = Some(self.updated_at);
        Ok(())
    }

    /// Moves to `needs_review` when the report asks for a reviewer, otherwise `completed`.
    pub fn finish(&mut self, report: AnalysisReport) -> Result<(), InvalidTransition> {
        let next = if report.requires_human_review {
            AnalysisStatus::NeedsReview
        } else {
            AnalysisStatus::Completed
        };
        self.transition(next)?;
        self.summary = Some(report.executive_summary);
        self.findings = report.key_findings;
        self.recommendations = report.recommendations;
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    pub fn fail(&mut self, error_message: impl Into<String>) -> Result<(), InvalidTransition> {
        self.transition(AnalysisStatus::Failed)?;
        self.error_message = Some(error_message.into());
        Ok(())
    }
}
