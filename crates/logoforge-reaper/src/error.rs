//! Error vocabulary for the Reaper (C10).

use logoforge_blob_store::BlobStoreError;
use logoforge_meta_store::MetaStoreError;
use logoforge_task_registry::TaskRegistryError;

#[derive(Debug, thiserror::Error)]
pub enum ReaperError {
    #[error(transparent)]
    TaskRegistry(#[from] TaskRegistryError),

    #[error(transparent)]
    MetaStore(#[from] MetaStoreError),

    #[error(transparent)]
    BlobStore(#[from] BlobStoreError),
}
