use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::{AnalysisRepository, DocumentRepository, RepositoryError};
use crate::domain::{Analysis, AnalysisId, CompanyId, DocumentId, DocumentRecord};

/// Process-local record store used by the CLI when no database is configured,
/// and by tests.
#[derive(Default)]
pub struct InMemoryAnalysisRepository {
    analyses: RwLock<HashMap<AnalysisId, Analysis>>,
}

impl InMemoryAnalysisRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisRepository for InMemoryAnalysisRepository {
    async fn create(&self, analysis: &Analysis) -> Result<(), RepositoryError> {
        let mut analyses = self.analyses.write().await;
        if analyses.contains_key(&analysis.id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "analysis {} already exists",
                analysis.id
            )));
        }
        analyses.insert(analysis.id, analysis.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: AnalysisId) -> Result<Option<Analysis>, RepositoryError> {
        Ok(self.analyses.read().await.get(&id).cloned())
    }

    async fn update(&self, analysis: &Analysis) -> Result<(), RepositoryError> {
        match self.analyses.write().await.get_mut(&analysis.id) {
            Some(existing) => {
                *existing = analysis.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(analysis.id.to_string())),
        }
    }

    async fn list_by_company(&self, company_id: CompanyId) -> Result<Vec<Analysis>, RepositoryError> {
        let mut found: Vec<Analysis> = self
            .analyses
            .read()
            .await
            .values()
            .filter(|a| a.company_id == company_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

#[derive(Default)]
pub struct InMemoryDocumentRepository {
    documents: RwLock<HashMap<DocumentId, DocumentRecord>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn create(&self, document: &DocumentRecord) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(&document.id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "document {} already exists",
                document.id
            )));
        }
        documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: DocumentId) -> Result<Option<DocumentRecord>, RepositoryError> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn list_by_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<DocumentRecord>, RepositoryError> {
        let mut found: Vec<DocumentRecord> = self
            .documents
            .read()
            .await
            .values()
            .filter(|d| d.company_id == company_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn delete(&self, id: DocumentId) -> Result<(), RepositoryError> {
        self.documents
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}
