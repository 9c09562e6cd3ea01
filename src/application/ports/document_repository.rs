use async_trait::async_trait;

use crate::domain::{CompanyId, DocumentId, DocumentRecord};

use super::RepositoryError;

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create(&self, document: &DocumentRecord) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: DocumentId) -> Result<Option<DocumentRecord>, RepositoryError>;

    async fn list_by_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<DocumentRecord>, RepositoryError>;

    async fn delete(&self, id: DocumentId) -> Result<(), RepositoryError>;
}
