//! Error vocabulary for the Worker (C7).

use logoforge_blob_store::BlobStoreError;
use logoforge_image_processor::ImageProcessorError;
use logoforge_image_provider::ImageProviderError;
use logoforge_meta_store::MetaStoreError;
use logoforge_task_registry::TaskRegistryError;

/// Distinguishes the two kinds of workflow failure named by spec.md §7:
/// *transient* errors should let the bus redeliver the message (status
/// stays `processing`); *permanent* errors end the task as `failed`.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("transient error: {0}")]
    Transient(String),

    #[error("permanent error: {0}")]
    Permanent(String),

    /// Every sub-generation in the parallel palette stage failed (spec.md
    /// §4.7 failure policy: "if all sub-generations fail, mark the Task
    /// failed").
    #[error("all {count} palette generations failed")]
    AllPalettesFailed { count: usize },

    /// The Task's `is_cancelled` flag was observed between stages
    /// (spec.md §5 cancellation semantics).
    #[error("cancelled")]
    Cancelled,
}

impl From<ImageProviderError> for WorkflowError {
    fn from(err: ImageProviderError) -> Self {
        match err {
            ImageProviderError::Transient(msg) => WorkflowError::Transient(msg),
            ImageProviderError::Permanent(msg) => WorkflowError::Permanent(msg),
        }
    }
}

impl From<BlobStoreError> for WorkflowError {
    fn from(err: BlobStoreError) -> Self {
        match err {
            BlobStoreError::NotFound(path) => WorkflowError::Permanent(format!("blob not found: {path}")),
            other => WorkflowError::Transient(other.to_string()),
        }
    }
}

impl From<MetaStoreError> for WorkflowError {
    fn from(err: MetaStoreError) -> Self {
        WorkflowError::Transient(err.to_string())
    }
}

impl From<ImageProcessorError> for WorkflowError {
    fn from(err: ImageProcessorError) -> Self {
        WorkflowError::Permanent(err.to_string())
    }
}

/// Top-level error from `WorkerLoop::on_message` — distinct from
/// `WorkflowError` because it also covers Task Registry/bus plumbing
/// failures that are not part of the generation workflow proper.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    TaskRegistry(#[from] TaskRegistryError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Bus(#[from] logoforge_bus::BusError),
}
