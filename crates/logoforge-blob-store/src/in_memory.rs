//! In-memory BlobStore backend. Suitable for development, tests, and
//! single-instance deployments. `signed_url` returns a `mem://` URL rather
//! than a real signed link — there is no network boundary to cross.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::BlobStoreError;
use crate::traits::BlobStore;

struct StoredBlob {
    bytes: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
}

#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobStoreError> {
        self.blobs.write().await.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, BlobStoreError> {
        self.blobs
            .read()
            .await
            .get(path)
            .map(|b| b.bytes.clone())
            .ok_or_else(|| BlobStoreError::NotFound(path.to_string()))
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, BlobStoreError> {
        if !self.blobs.read().await.contains_key(path) {
            return Err(BlobStoreError::NotFound(path.to_string()));
        }
        Ok(format!("mem://{path}?ttl={}", ttl.as_secs()))
    }

    async fn delete(&self, path: &str) -> Result<(), BlobStoreError> {
        self.blobs.write().await.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryBlobStore::new();
        store.put("concepts/a/base.png", vec![1, 2, 3], "image/png").await.unwrap();
        let bytes = store.get("concepts/a/base.png").await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn get_missing_returns_not_found() {
        let store = InMemoryBlobStore::new();
        assert!(matches!(store.get("missing").await, Err(BlobStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn signed_url_fails_for_missing_blob() {
        let store = InMemoryBlobStore::new();
        assert!(store.signed_url("missing", Duration::from_secs(60)).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_blob() {
        let store = InMemoryBlobStore::new();
        store.put("a", vec![1], "image/png").await.unwrap();
        store.delete("a").await.unwrap();
        assert!(store.get("a").await.is_err());
    }
}
