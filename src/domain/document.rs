use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CompanyId, DocumentId, UserId};

/// A file handed to the pipeline: its name drives format detection.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub file_name: String,
    pub data: Bytes,
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Governance,
    Financial,
    Compliance,
    Risk,
    Strategy,
    Minutes,
    Report,
    Policy,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Governance => "governance",
            Self::Financial => "financial",
            Self::Compliance => "compliance",
            Self::Risk => "risk",
            Self::Strategy => "strategy",
            Self::Minutes => "minutes",
            Self::Report => "report",
            Self::Policy => "policy",
            Self::Other => "other",
        }
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "governance" => Ok(Self::Governance),
            "financial" => Ok(Self::Financial),
            "compliance" => Ok(Self::Compliance),
            "risk" => Ok(Self::Risk),
            "strategy" => Ok(Self::Strategy),
            "minutes" => Ok(Self::Minutes),
            "report" => Ok(Self::Report),
            "policy" => Ok(Self::Policy),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid document type: {}", s)),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Analyzed,
    NeedsReview,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Analyzed => "analyzed",
            Self::NeedsReview => "needs_review",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "analyzed" => Ok(Self::Analyzed),
            "needs_review" => Ok(Self::NeedsReview),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("Invalid document status: {}", s)),
        }
    }
}

/// Persisted record for an uploaded board document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub name: String,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub url: String,
    pub storage_path: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(
        company_id: CompanyId,
        user_id: UserId,
        name: String,
        document_type: DocumentType,
        url: String,
        storage_path: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            company_id,
            user_id,
            name,
            document_type,
            status: DocumentStatus::Pending,
            url,
            storage_path,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }
}
