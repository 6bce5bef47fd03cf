//! Error vocabulary for BlobStore (C3) operations.

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(String),

    /// Signing a read URL failed. Non-fatal per spec.md §4.3: the caller
    /// falls back to returning the raw path and lets a later request re-sign.
    #[error("failed to sign url for {path}: {reason}")]
    SigningFailed { path: String, reason: String },
}
