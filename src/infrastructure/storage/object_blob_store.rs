use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as StorePath;
use object_store::{Attribute, Attributes, ObjectStore, PutMode, PutOptions, PutPayload};
use tracing::instrument;

use crate::application::ports::{BlobStore, BlobStoreError, UploadOptions};
use crate::domain::StoragePath;

/// [`BlobStore`] over any `object_store` backend.
pub struct ObjectBlobStore {
    inner: Arc<dyn ObjectStore>,
    public_base_url: String,
    // LocalFileSystem rejects object attributes, so content type is only sent
    // to backends that keep it.
    supports_attributes: bool,
}

impl ObjectBlobStore {
    pub fn local(base_path: PathBuf, public_base_url: Option<String>) -> Result<Self, BlobStoreError> {
        std::fs::create_dir_all(&base_path)
            .map_err(|e| BlobStoreError::Configuration(e.to_string()))?;
        let public_base_url =
            public_base_url.unwrap_or_else(|| format!("file://{}", base_path.display()));
        let fs = LocalFileSystem::new_with_prefix(base_path)
            .map_err(|e| BlobStoreError::Configuration(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(fs),
            public_base_url,
            supports_attributes: false,
        })
    }

    pub fn azure(
        account: &str,
        access_key: &str,
        container: &str,
        public_base_url: Option<String>,
    ) -> Result<Self, BlobStoreError> {
        let store = MicrosoftAzureBuilder::new()
            .with_account(account)
            .with_access_key(access_key)
            .with_container_name(container)
            .build()
            .map_err(|e| BlobStoreError::Configuration(e.to_string()))?;
        let public_base_url = public_base_url.unwrap_or_else(|| {
            format!("https://{}.blob.core.windows.net/{}", account, container)
        });

        Ok(Self {
            inner: Arc::new(store),
            public_base_url,
            supports_attributes: true,
        })
    }

    pub fn in_memory(public_base_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
            public_base_url: public_base_url.into(),
            supports_attributes: true,
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for ObjectBlobStore {
    #[instrument(skip(self), fields(path = %path))]
    async fn download(&self, path: &StoragePath) -> Result<Bytes, BlobStoreError> {
        let store_path = StorePath::from(path.as_str());
        let result = self.inner.get(&store_path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => BlobStoreError::NotFound(path.to_string()),
            other => BlobStoreError::DownloadFailed(other.to_string()),
        })?;

        result
            .bytes()
            .await
            .map_err(|e| BlobStoreError::DownloadFailed(e.to_string()))
    }

    /// Without `upsert` an existing object is left untouched and the upload
    /// fails with [`BlobStoreError::AlreadyExists`].
    #[instrument(skip(self, data), fields(path = %path, size = data.len(), upsert = options.upsert))]
    async fn upload(
        &self,
        path: &StoragePath,
        data: Bytes,
        content_type: &str,
        options: UploadOptions,
    ) -> Result<StoragePath, BlobStoreError> {
        let store_path = StorePath::from(path.as_str());

        let mut attributes = Attributes::new();
        if self.supports_attributes {
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
        }
        let put_options = PutOptions {
            mode: if options.upsert {
                PutMode::Overwrite
            } else {
                PutMode::Create
            },
            attributes,
            ..Default::default()
        };

        self.inner
            .put_opts(&store_path, PutPayload::from(data), put_options)
            .await
            .map_err(|e| match e {
                object_store::Error::AlreadyExists { .. } => {
                    BlobStoreError::AlreadyExists(path.to_string())
                }
                other => BlobStoreError::UploadFailed(other.to_string()),
            })?;

        Ok(path.clone())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn remove(&self, path: &StoragePath) -> Result<(), BlobStoreError> {
        let store_path = StorePath::from(path.as_str());
        self.inner
            .delete(&store_path)
            .await
            .map_err(|e| BlobStoreError::DeleteFailed(e.to_string()))
    }

    fn public_url(&self, path: &StoragePath) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), path)
    }
}
