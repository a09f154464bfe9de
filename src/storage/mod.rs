//! Storage backends for S3-compatible services
//!
//! [`S3Store`] talks to a real service through the AWS SDK,
//! [`MemoryStore`] keeps everything in process for tests.

mod memory;
mod s3_client;
mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::{MemoryObject, MemoryStore, RecordedCall};
pub use s3_client::S3Store;
pub use types::*;

/// One call per S3 operation, no retries or pagination
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// ListBuckets
    async fn list_buckets(&self) -> Result<BucketList>;

    /// ListObjects for a single bucket
    async fn list_objects(&self, bucket: &str) -> Result<ObjectList>;

    /// CreateBucket
    async fn create_bucket(&self, bucket: &str) -> Result<CreatedBucket>;

    /// DeleteBucket (the bucket must be empty)
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;

    /// DeleteObject
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<DeletedObject>;

    /// PutObject
    async fn put_object(&self, request: PutObjectRequest) -> Result<UploadMetadata>;
}
