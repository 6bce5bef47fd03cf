//! Error vocabulary for the Status Channel (C9).

#[derive(Debug, thiserror::Error)]
pub enum StatusChannelError {
    #[error(transparent)]
    MetaStore(#[from] logoforge_meta_store::MetaStoreError),

    #[error(transparent)]
    TaskRegistry(#[from] logoforge_task_registry::TaskRegistryError),

    #[error("task {0} not found")]
    TaskNotFound(uuid::Uuid),
}
