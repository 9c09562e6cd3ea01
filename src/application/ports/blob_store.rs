use bytes::Bytes;

use crate::domain::StoragePath;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub upsert: bool,
}

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn download(&self, path: &StoragePath) -> Result<Bytes, BlobStoreError>;

    async fn upload(
        &self,
        path: &StoragePath,
        data: Bytes,
        content_type: &str,
        options: UploadOptions,
    ) -> Result<StoragePath, BlobStoreError>;

    async fn remove(&self, path: &StoragePath) -> Result<(), BlobStoreError>;

    fn public_url(&self, path: &StoragePath) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("object already exists: {0}")]
    AlreadyExists(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("store configuration: {0}")]
    Configuration(String),
}
