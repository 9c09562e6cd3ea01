use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{DocumentRepository, RepositoryError};
use crate::domain::{CompanyId, DocumentId, DocumentRecord, DocumentStatus, DocumentType, UserId};

const SELECT_COLUMNS: &str = "id, company_id, user_id, name, type, status, url, storage_path, \
     metadata, created_at, updated_at";

pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    #[instrument(skip(self, document), fields(document_id = %document.id))]
    async fn create(&self, document: &DocumentRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, company_id, user_id, name, type, status, url, storage_path, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(document.id.as_uuid())
        .bind(document.company_id.as_uuid())
        .bind(document.user_id.as_str())
        .bind(&document.name)
        .bind(document.document_type.as_str())
        .bind(document.status.as_str())
        .bind(&document.url)
        .bind(&document.storage_path)
        .bind(Json(&document.metadata))
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    #[instrument(skip(self), fields(document_id = %id))]
    async fn get_by_id(&self, id: DocumentId) -> Result<Option<DocumentRecord>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.as_ref().map(document_from_row).transpose()
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn list_by_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<DocumentRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE company_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        rows.iter().map(document_from_row).collect()
    }

    #[instrument(skip(self), fields(document_id = %id))]
    async fn delete(&self, id: DocumentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn document_from_row(row: &PgRow) -> Result<DocumentRecord, RepositoryError> {
    let get_err = |e: sqlx::Error| RepositoryError::QueryFailed(e.to_string());

    let document_type = row
        .try_get::<String, _>("type")
        .map_err(get_err)?
        .parse::<DocumentType>()
        .map_err(RepositoryError::QueryFailed)?;
    let status = row
        .try_get::<String, _>("status")
        .map_err(get_err)?
        .parse::<DocumentStatus>()
        .map_err(RepositoryError::QueryFailed)?;
    let Json(metadata) = row
        .try_get::<Json<serde_json::Value>, _>("metadata")
        .map_err(get_err)?;

    Ok(DocumentRecord {
        id: DocumentId::from_uuid(row.try_get("id").map_err(get_err)?),
        company_id: CompanyId::from_uuid(row.try_get("company_id").map_err(get_err)?),
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(get_err)?),
        name: row.try_get("name").map_err(get_err)?,
        document_type,
        status,
        url: row.try_get("url").map_err(get_err)?,
        storage_path: row.try_get("storage_path").map_err(get_err)?,
        metadata,
        created_at: row.try_get("created_at").map_err(get_err)?,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
    })
}

pub(super) fn map_write_error(e: sqlx::Error) -> RepositoryError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
            RepositoryError::ConstraintViolation(db.message().to_string())
        }
        _ => RepositoryError::QueryFailed(e.to_string()),
    }
}
