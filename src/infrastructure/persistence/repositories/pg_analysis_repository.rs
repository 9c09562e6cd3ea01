use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{AnalysisRepository, RepositoryError};
use crate::domain::{
    Analysis, AnalysisId, AnalysisStatus, CompanyId, DocumentId, DocumentType, Finding, UserId,
};

use super::pg_document_repository::map_write_error;

const SELECT_COLUMNS: &str = "id, company_id, analyzer_id, document_ids, type, title, status, \
     summary, findings, recommendations, error_message, metadata, started_at, completed_at, \
     created_at, updated_at";

pub struct PgAnalysisRepository {
    pool: PgPool,
}

impl PgAnalysisRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisRepository for PgAnalysisRepository {
    #[instrument(skip(self, analysis), fields(analysis_id = %analysis.id))]
    async fn create(&self, analysis: &Analysis) -> Result<(), RepositoryError> {
        let document_ids: Vec<Uuid> = analysis.document_ids.iter().map(|id| id.as_uuid()).collect();

        sqlx::query(
            r#"
            INSERT INTO document_analysis (
                id, company_id, analyzer_id, document_ids, type, title, status, summary,
                findings, recommendations, error_message, metadata, started_at, completed_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(analysis.id.as_uuid())
        .bind(analysis.company_id.as_uuid())
        .bind(analysis.analyzer_id.as_str())
        .bind(&document_ids)
        .bind(analysis.document_type.as_str())
        .bind(&analysis.title)
        .bind(analysis.status.as_str())
        .bind(&analysis.summary)
        .bind(Json(&analysis.findings))
        .bind(Json(&analysis.recommendations))
        .bind(&analysis.error_message)
        .bind(Json(&analysis.metadata))
        .bind(analysis.started_at)
        .bind(analysis.completed_at)
        .bind(analysis.created_at)
        .bind(analysis.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    #[instrument(skip(self), fields(analysis_id = %id))]
    async fn get_by_id(&self, id: AnalysisId) -> Result<Option<Analysis>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM document_analysis WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.as_ref().map(analysis_from_row).transpose()
    }

    /// Writes every mutable column; status transitions are checked by the
    /// domain before this is called.
    #[instrument(skip(self, analysis), fields(analysis_id = %analysis.id, status = %analysis.status))]
    async fn update(&self, analysis: &Analysis) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE document_analysis
            SET status = $2, summary = $3, findings = $4, recommendations = $5,
                error_message = $6, metadata = $7, started_at = $8, completed_at = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(analysis.id.as_uuid())
        .bind(analysis.status.as_str())
        .bind(&analysis.summary)
        .bind(Json(&analysis.findings))
        .bind(Json(&analysis.recommendations))
        .bind(&analysis.error_message)
        .bind(Json(&analysis.metadata))
        .bind(analysis.started_at)
        .bind(analysis.completed_at)
        .bind(analysis.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(analysis.id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn list_by_company(&self, company_id: CompanyId) -> Result<Vec<Analysis>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM document_analysis WHERE company_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        rows.iter().map(analysis_from_row).collect()
    }
}

fn analysis_from_row(row: &PgRow) -> Result<Analysis, RepositoryError> {
    let get_err = |e: sqlx::Error| RepositoryError::QueryFailed(e.to_string());

    let document_type = row
        .try_get::<String, _>("type")
        .map_err(get_err)?
        .parse::<DocumentType>()
        .map_err(RepositoryError::QueryFailed)?;
    let status = row
        .try_get::<String, _>("status")
        .map_err(get_err)?
        .parse::<AnalysisStatus>()
        .map_err(RepositoryError::QueryFailed)?;
    let document_ids = row
        .try_get::<Vec<Uuid>, _>("document_ids")
        .map_err(get_err)?
        .into_iter()
        .map(DocumentId::from_uuid)
        .collect();
    let Json(findings) = row
        .try_get::<Json<Vec<Finding>>, _>("findings")
        .map_err(get_err)?;
    let Json(recommendations) = row
        .try_get::<Json<Vec<String>>, _>("recommendations")
        .map_err(get_err)?;
    let Json(metadata) = row
        .try_get::<Json<serde_json::Value>, _>("metadata")
        .map_err(get_err)?;

    Ok(Analysis {
        id: AnalysisId::from_uuid(row.try_get("id").map_err(get_err)?),
        company_id: CompanyId::from_uuid(row.try_get("company_id").map_err(get_err)?),
        analyzer_id: UserId::new(row.try_get::<String, _>("analyzer_id").map_err(get_err)?),
        document_ids,
        document_type,
        title: row.try_get("title").map_err(get_err)?,
        status,
        summary: row.try_get("summary").map_err(get_err)?,
        findings,
        recommendations,
        error_message: row.try_get("error_message").map_err(get_err)?,
        metadata,
        started_at: row.try_get("started_at").map_err(get_err)?,
        completed_at: row.try_get("completed_at").map_err(get_err)?,
        created_at: row.try_get("created_at").map_err(get_err)?,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
    })
}
