use async_trait::async_trait;

use crate::domain::{Analysis, AnalysisId, CompanyId};

use super::RepositoryError;

#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    async fn create(&self, analysis: &Analysis) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: AnalysisId) -> Result<Option<Analysis>, RepositoryError>;

    async fn update(&self, analysis: &Analysis) -> Result<(), RepositoryError>;

    async fn list_by_company(&self, company_id: CompanyId) -> Result<Vec<Analysis>, RepositoryError>;
}
