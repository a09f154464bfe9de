//! Storage client facade
//!
//! Holds the configuration and one backend, and forwards each call to the
//! backend unchanged. Results are neither filtered nor reordered.

use std::path::Path;
use std::sync::Arc;

use aws_sdk_s3::primitives::ByteStream;

use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::storage::{
    BucketList, CreatedBucket, DeletedObject, ObjectList, ObjectStore, PutObjectRequest, S3Store,
    UploadMetadata,
};

/// Client for an S3-compatible object storage service
///
/// Cheap to clone; clones share the configuration and the backend.
#[derive(Clone)]
pub struct StorageClient {
    config: Arc<StorageConfig>,
    store: Arc<dyn ObjectStore>,
}

impl StorageClient {
    /// Build a client backed by the AWS SDK
    pub fn new(config: StorageConfig) -> Result<Self> {
        let store = S3Store::new(&config)?;
        Self::with_store(config, store)
    }

    /// Build a client over an explicit backend
    pub fn with_store(config: StorageConfig, store: impl ObjectStore + 'static) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            endpoint = %config.endpoint,
            region = %config.region,
            acl = %config.acl,
            "Storage client initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// List the buckets visible to the configured credentials
    pub async fn list_buckets(&self) -> Result<BucketList> {
        tracing::debug!("Listing buckets");
        self.store.list_buckets().await.map_err(log_failure)
    }

    /// List the objects in `bucket`
    pub async fn list_objects(&self, bucket: &str) -> Result<ObjectList> {
        tracing::debug!(bucket, "Listing objects");
        self.store.list_objects(bucket).await.map_err(log_failure)
    }

    /// Create `bucket`. Naming rules and conflicts are up to the service.
    pub async fn create_bucket(&self, bucket: &str) -> Result<CreatedBucket> {
        tracing::debug!(bucket, "Creating bucket");
        self.store.create_bucket(bucket).await.map_err(log_failure)
    }

    /// Delete the object in `bucket` whose key is the configured access key
    ///
    /// This mirrors the historical behavior of this call. Use
    /// [`delete_object_at`](Self::delete_object_at) to delete a chosen key and
    /// [`delete_bucket`](Self::delete_bucket) to remove an empty bucket.
    pub async fn delete_object(&self, bucket: &str) -> Result<DeletedObject> {
        self.delete_object_at(bucket, &self.config.credentials.key).await
    }

    /// Delete the object `key` in `bucket`
    pub async fn delete_object_at(&self, bucket: &str, key: &str) -> Result<DeletedObject> {
        tracing::debug!(bucket, key, "Deleting object");
        self.store
            .delete_object(bucket, key)
            .await
            .map_err(log_failure)
    }

    /// Delete an empty bucket
    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        tracing::debug!(bucket, "Deleting bucket");
        self.store.delete_bucket(bucket).await.map_err(log_failure)
    }

    /// Upload the file at `source` to `bucket` under `key` with the configured ACL
    ///
    /// The content type is guessed from the file extension.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: impl AsRef<Path>,
    ) -> Result<UploadMetadata> {
        let source = source.as_ref();
        tracing::debug!(bucket, key, source = %source.display(), "Uploading object");

        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::Source {
                path: source.to_path_buf(),
                source: e,
            })
            .map_err(log_failure)?;

        let content_type = mime_guess::from_path(source)
            .first()
            .map(|mime| mime.essence_str().to_string());

        let request = PutObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            content_type,
            acl: self.config.acl,
        };

        let metadata = self.store.put_object(request).await.map_err(log_failure)?;

        tracing::info!(
            bucket,
            key,
            request_id = metadata.request_id.as_deref().unwrap_or("-"),
            "Uploaded object"
        );

        Ok(metadata)
    }

    /// [`put_object`](Self::put_object) with failures reduced to their message
    pub async fn put_object_message(
        &self,
        bucket: &str,
        key: &str,
        source: impl AsRef<Path>,
    ) -> std::result::Result<UploadMetadata, String> {
        self.put_object(bucket, key, source)
            .await
            .map_err(|e| e.message())
    }
}

fn log_failure(err: StorageError) -> StorageError {
    tracing::warn!(error = %err, code = err.code().unwrap_or("-"), "Storage request failed");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Acl;
    use crate::error::ErrorKind;
    use crate::storage::{MemoryObject, MemoryStore, RecordedCall};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ACCESS_KEY: &str = "kilatstorage-key";

    fn client_with(store: &MemoryStore) -> StorageClient {
        let config = StorageConfig::with_credentials(ACCESS_KEY, "kilatstorage-secret");
        StorageClient::with_store(config, store.clone()).unwrap()
    }

    fn source_file(suffix: &str, contents: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    fn call(operation: &'static str, bucket: &str, key: Option<&str>) -> RecordedCall {
        RecordedCall {
            operation,
            bucket: Some(bucket.to_string()),
            key: key.map(|k| k.to_string()),
        }
    }

    #[tokio::test]
    async fn test_new_does_not_need_network() {
        let config = StorageConfig::with_credentials(ACCESS_KEY, "kilatstorage-secret");
        let client = StorageClient::new(config).unwrap();
        assert_eq!(client.config().region, "id-jkt-1");
    }

    #[tokio::test]
    async fn test_new_rejects_bad_config() {
        assert!(matches!(
            StorageClient::new(StorageConfig::default()),
            Err(StorageError::InvalidConfig(_))
        ));

        let mut config = StorageConfig::with_credentials(ACCESS_KEY, "kilatstorage-secret");
        config.endpoint = "not a url".to_string();
        assert!(matches!(
            StorageClient::with_store(config, MemoryStore::new()),
            Err(StorageError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_list_buckets_passes_through() {
        let store = MemoryStore::with_buckets(["B", "A"]);
        let client = client_with(&store);

        let list = client.list_buckets().await.unwrap();
        assert_eq!(list.names(), vec!["B", "A"]);
        assert_eq!(list, store.list_buckets().await.unwrap());
    }

    #[tokio::test]
    async fn test_list_objects_forwards_bucket() {
        let store = MemoryStore::new();
        store.insert_object("marketplace", "b.jpg", b"b".to_vec()).await;
        store.insert_object("marketplace", "a.jpg", b"a".to_vec()).await;
        let client = client_with(&store);

        let list = client.list_objects("marketplace").await.unwrap();
        assert_eq!(list.bucket, "marketplace");
        assert_eq!(list.keys(), vec!["b.jpg", "a.jpg"]);
        assert_eq!(store.calls().await, vec![call("ListObjects", "marketplace", None)]);
    }

    #[tokio::test]
    async fn test_create_bucket_surfaces_duplicate_error() {
        let store = MemoryStore::new();
        let client = client_with(&store);

        client.create_bucket("new-bucket").await.unwrap();
        assert!(store.bucket_exists("new-bucket").await);

        let err = client.create_bucket("new-bucket").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Service));
        assert_eq!(err.code(), Some("BucketAlreadyOwnedByYou"));
        assert_eq!(
            store.calls().await,
            vec![
                call("CreateBucket", "new-bucket", None),
                call("CreateBucket", "new-bucket", None),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_bucket_surfaces_scripted_error() {
        let store = MemoryStore::new();
        store
            .fail_next("CreateBucket", "InvalidBucketName", "The specified bucket is not valid.")
            .await;
        let client = client_with(&store);

        let err = client.create_bucket("Bad_Name").await.unwrap_err();
        assert_eq!(err.code(), Some("InvalidBucketName"));
        assert_eq!(err.message(), "The specified bucket is not valid.");
    }

    #[tokio::test]
    async fn test_delete_object_uses_access_key() {
        let store = MemoryStore::new();
        store.insert_object("marketplace", ACCESS_KEY, b"x".to_vec()).await;
        store.insert_object("marketplace", "keep.jpg", b"y".to_vec()).await;
        let client = client_with(&store);

        let deleted = client.delete_object("marketplace").await.unwrap();
        assert_eq!(deleted.key, ACCESS_KEY);
        assert!(store.object("marketplace", ACCESS_KEY).await.is_none());
        assert!(store.object("marketplace", "keep.jpg").await.is_some());
        assert_eq!(
            store.calls().await,
            vec![call("DeleteObject", "marketplace", Some(ACCESS_KEY))]
        );
    }

    #[tokio::test]
    async fn test_delete_object_at_and_delete_bucket() {
        let store = MemoryStore::new();
        store.insert_object("old-bucket", "a.jpg", b"a".to_vec()).await;
        let client = client_with(&store);

        client.delete_object_at("old-bucket", "a.jpg").await.unwrap();
        client.delete_bucket("old-bucket").await.unwrap();
        assert!(!store.bucket_exists("old-bucket").await);
    }

    #[tokio::test]
    async fn test_put_object_returns_metadata() {
        let store = MemoryStore::with_buckets(["marketplace"]);
        store.set_request_id("abc").await;
        let client = client_with(&store);
        let file = source_file(".jpg", b"jpeg bytes");

        let metadata = client
            .put_object("marketplace", "assets/images/x.jpg", file.path())
            .await
            .unwrap();
        assert_eq!(metadata.status_code, 200);
        assert_eq!(metadata.request_id.as_deref(), Some("abc"));

        let stored: MemoryObject = store
            .object("marketplace", "assets/images/x.jpg")
            .await
            .unwrap();
        assert_eq!(stored.data, b"jpeg bytes");
        assert_eq!(stored.acl, Acl::PublicRead);
        assert_eq!(stored.content_type.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn test_put_object_applies_configured_acl() {
        let store = MemoryStore::with_buckets(["marketplace"]);
        let mut config = StorageConfig::with_credentials(ACCESS_KEY, "kilatstorage-secret");
        config.acl = Acl::Private;
        let client = StorageClient::with_store(config, store.clone()).unwrap();
        let file = source_file(".bin-unknown-ext", b"data");

        client.put_object("marketplace", "blob", file.path()).await.unwrap();

        let stored = store.object("marketplace", "blob").await.unwrap();
        assert_eq!(stored.acl, Acl::Private);
        assert_eq!(stored.content_type, None);
    }

    #[tokio::test]
    async fn test_put_object_message_on_access_denied() {
        let store = MemoryStore::with_buckets(["marketplace"]);
        store.fail_next("PutObject", "AccessDenied", "Access Denied").await;
        let client = client_with(&store);
        let file = source_file(".jpg", b"jpeg bytes");

        let result = client
            .put_object_message("marketplace", "assets/images/x.jpg", file.path())
            .await;
        assert_eq!(result, Err("Access Denied".to_string()));
    }

    #[tokio::test]
    async fn test_put_object_missing_source() {
        let store = MemoryStore::with_buckets(["marketplace"]);
        let client = client_with(&store);

        let err = client
            .put_object("marketplace", "x.jpg", "/nonexistent/dir/x.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Source { .. }));
        assert!(store.calls().await.is_empty());
    }
}
