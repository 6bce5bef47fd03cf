//! S3-backed BlobStore. AWS wiring follows the same `aws_config`-bootstrapped
//! pattern the teacher's DynamoDB backend uses; this crate has no teacher
//! counterpart, so the gateway-trait-plus-fake shape of every other C1–C4
//! gateway is what's being imitated here instead of a specific source file.

use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;

use async_trait::async_trait;

use crate::error::BlobStoreError;
use crate::traits::BlobStore;

#[derive(Debug, Clone)]
pub struct S3BlobStoreConfig {
    pub bucket: String,
    pub region: String,
}

pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub async fn connect(config: S3BlobStoreConfig) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .load()
            .await;
        Self {
            client: Client::new(&aws_config),
            bucket: config.bucket,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobStoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, BlobStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    BlobStoreError::NotFound(path.to_string())
                } else {
                    BlobStoreError::Backend(e.to_string())
                }
            })?;
        let bytes = output.body.collect().await.map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, BlobStoreError> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| BlobStoreError::SigningFailed { path: path.to_string(), reason: e.to_string() })?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presigning)
            .await
            .map_err(|e| BlobStoreError::SigningFailed { path: path.to_string(), reason: e.to_string() })?;
        Ok(presigned.uri().to_string())
    }

    async fn delete(&self, path: &str) -> Result<(), BlobStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        Ok(())
    }
}
