//! Convenient imports: `use logoforge_blob_store::prelude::*;`

pub use crate::error::BlobStoreError;
#[cfg(feature = "in-memory")]
pub use crate::in_memory::InMemoryBlobStore;
#[cfg(feature = "s3")]
pub use crate::s3::{S3BlobStore, S3BlobStoreConfig};
pub use crate::traits::{BlobStore, MIN_SIGNED_URL_TTL};
