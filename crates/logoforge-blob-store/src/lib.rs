//! # BlobStore gateway (C3)
//!
//! Upload/download image bytes, issue time-bounded read URLs (spec.md
//! §4.3). Paths are write-once and hierarchical under an environment-scoped
//! bucket name resolved by `logoforge-config`.

pub mod error;
#[cfg(feature = "in-memory")]
pub mod in_memory;
pub mod prelude;
#[cfg(feature = "s3")]
pub mod s3;
pub mod traits;

pub use error::BlobStoreError;
#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryBlobStore;
#[cfg(feature = "s3")]
pub use s3::{S3BlobStore, S3BlobStoreConfig};
pub use traits::{BlobStore, MIN_SIGNED_URL_TTL};
