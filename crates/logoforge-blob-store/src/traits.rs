//! The BlobStore gateway (C3): upload/download image bytes, issue
//! time-bounded read URLs (spec.md §4.3). Paths are hierarchical under a
//! bucket whose name is environment-scoped (`logoforge_config::BucketNames`).
//! Write-once: the Worker picks a UUID path and never overwrites it
//! (spec.md §5 Shared resources).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BlobStoreError;

/// The BlobStore gateway (C3).
#[async_trait]
pub trait BlobStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobStoreError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, BlobStoreError>;

    /// Issue a read URL valid for at least `ttl` (spec.md §4.3: "must be
    /// valid for at least 24h for display purposes"). A signing failure is
    /// non-fatal for callers that are prepared to fall back to the raw path.
    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, BlobStoreError>;

    async fn delete(&self, path: &str) -> Result<(), BlobStoreError>;
}

/// The display-layer default TTL (spec.md §4.3).
pub const MIN_SIGNED_URL_TTL: Duration = Duration::from_secs(24 * 3600);
