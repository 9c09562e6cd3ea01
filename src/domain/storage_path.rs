use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use super::{CompanyId, UserId};

const PUBLIC_OBJECT_MARKER: &str = "/storage/v1/object/public/";

/// Bucket-relative location of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath(String);

impl StoragePath {
    /// `{userId}/{companyId}/{fileName}`
    pub fn company_document(user_id: &UserId, company_id: &CompanyId, file_name: &str) -> Self {
        Self(format!("{}/{}/{}", user_id, company_id.as_uuid(), file_name))
    }

    /// `{userId}/documents/{timestamp}-{sanitizedFileName}`
    pub fn user_upload(user_id: &UserId, uploaded_at: DateTime<Utc>, file_name: &str) -> Self {
        Self(format!(
            "{}/documents/{}-{}",
            user_id,
            uploaded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            sanitize_file_name(file_name)
        ))
    }

    /// Accepts either a bucket path or a public object URL of the form
    /// `.../storage/v1/object/public/<bucket>/<path>`.
    pub fn from_public_url(value: &str) -> Self {
        match value.split_once(PUBLIC_OBJECT_MARKER) {
            Some((_, rest)) => {
                let rest = rest.split(['?', '#']).next().unwrap_or_default();
                let path = rest.split_once('/').map(|(_, p)| p).unwrap_or_default();
                Self(path.to_string())
            }
            None => Self(value.to_string()),
        }
    }

    pub fn from_raw(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, falling back to `"document"` for an empty path.
    pub fn file_name(&self) -> &str {
        match self.0.rsplit('/').next() {
            Some(name) if !name.is_empty() => name,
            _ => "document",
        }
    }
}

pub fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
