use std::path::PathBuf;
use std::sync::Arc;

use crate::application::ports::{BlobStore, BlobStoreError};
use crate::presentation::config::{StorageProviderSetting, StorageSettings};

use super::object_blob_store::ObjectBlobStore;

pub struct BlobStoreFactory;

impl BlobStoreFactory {
    pub fn create(settings: &StorageSettings) -> Result<Arc<dyn BlobStore>, BlobStoreError> {
        let public_base_url = settings.public_base_url.clone();

        match settings.provider {
            StorageProviderSetting::Local => {
                // The bucket becomes a directory so paths match the remote layout.
                let path = PathBuf::from(&settings.local_path).join(&settings.bucket);
                let store = ObjectBlobStore::local(path, public_base_url)?;
                Ok(Arc::new(store))
            }
            StorageProviderSetting::Azure => {
                let account = settings.azure_account.as_deref().ok_or_else(|| {
                    BlobStoreError::Configuration("azure_account required".into())
                })?;
                let key = settings.azure_access_key.as_deref().ok_or_else(|| {
                    BlobStoreError::Configuration("azure_access_key required".into())
                })?;
                let container = settings
                    .azure_container
                    .as_deref()
                    .unwrap_or(settings.bucket.as_str());
                let store = ObjectBlobStore::azure(account, key, container, public_base_url)?;
                Ok(Arc::new(store))
            }
            StorageProviderSetting::Memory => {
                let base = public_base_url.unwrap_or_else(|| format!("memory://{}", settings.bucket));
                Ok(Arc::new(ObjectBlobStore::in_memory(base)))
            }
        }
    }
}
