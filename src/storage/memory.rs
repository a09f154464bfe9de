//! In-memory storage backend
//!
//! Behaves like a single-tenant S3 service where missing buckets fail with
//! `NoSuchBucket`. Buckets and keys come back in insertion order.
//! Every call is recorded, and the next call of an operation can be made to
//! fail with a chosen error code and message.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tokio::sync::{RwLock, RwLockWriteGuard};
use uuid::Uuid;

use crate::config::Acl;
use crate::error::{Result, StorageError};

use super::types::{
    BucketList, BucketSummary, CreatedBucket, DeletedObject, ObjectList, ObjectMetadata,
    PutObjectRequest, UploadMetadata,
};
use super::ObjectStore;

/// A call received by the store, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub bucket: Option<String>,
    pub key: Option<String>,
}

/// An object held by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
    pub acl: Acl,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug)]
struct MemoryBucket {
    created: DateTime<Utc>,
    objects: IndexMap<String, MemoryObject>,
}

impl MemoryBucket {
    fn new() -> Self {
        Self {
            created: Utc::now(),
            objects: IndexMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    buckets: IndexMap<String, MemoryBucket>,
    calls: Vec<RecordedCall>,
    /// operation -> (code, message) for the next call of that operation
    failures: HashMap<&'static str, (String, String)>,
    request_id: Option<String>,
}

/// In-process object store; clones share state
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with empty buckets
    pub fn with_buckets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buckets = names
            .into_iter()
            .map(|name| (name.into(), MemoryBucket::new()))
            .collect();

        Self {
            state: Arc::new(RwLock::new(MemoryState {
                buckets,
                ..Default::default()
            })),
        }
    }

    /// Fail the next call of `operation` (e.g. `"PutObject"`) with a service error
    pub async fn fail_next(
        &self,
        operation: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        let mut state = self.state.write().await;
        state
            .failures
            .insert(operation, (code.into(), message.into()));
    }

    /// Report `request_id` from every upload instead of a random one
    pub async fn set_request_id(&self, request_id: impl Into<String>) {
        self.state.write().await.request_id = Some(request_id.into());
    }

    /// Store an object directly, bypassing the call log
    pub async fn insert_object(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        let data = data.into();
        let mut state = self.state.write().await;
        state
            .buckets
            .entry(bucket.to_string())
            .or_insert_with(MemoryBucket::new)
            .objects
            .insert(key.to_string(), new_object(data, None, Acl::Private));
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<MemoryObject> {
        let state = self.state.read().await;
        state.buckets.get(bucket)?.objects.get(key).cloned()
    }

    pub async fn bucket_exists(&self, bucket: &str) -> bool {
        self.state.read().await.buckets.contains_key(bucket)
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().await.calls.clone()
    }

    /// Log the call and apply a scripted failure, if any
    async fn begin(
        &self,
        operation: &'static str,
        bucket: Option<&str>,
        key: Option<&str>,
    ) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        let mut state = self.state.write().await;
        state.calls.push(RecordedCall {
            operation,
            bucket: bucket.map(|s| s.to_string()),
            key: key.map(|s| s.to_string()),
        });

        if let Some((code, message)) = state.failures.remove(operation) {
            tracing::debug!(operation, code = %code, "Scripted failure");
            return Err(StorageError::service(operation, code, message));
        }

        Ok(state)
    }
}

fn new_object(data: Vec<u8>, content_type: Option<String>, acl: Acl) -> MemoryObject {
    let digest = Sha256::digest(&data);
    MemoryObject {
        etag: format!("\"{}\"", hex::encode(&digest[..16])),
        data,
        content_type,
        acl,
        last_modified: Utc::now(),
    }
}

fn no_such_bucket(operation: &'static str) -> StorageError {
    StorageError::service(
        operation,
        "NoSuchBucket",
        "The specified bucket does not exist",
    )
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<BucketList> {
        let state = self.begin("ListBuckets", None, None).await?;

        let buckets = state
            .buckets
            .iter()
            .map(|(name, bucket)| BucketSummary {
                name: name.clone(),
                creation_date: Some(bucket.created),
            })
            .collect();

        Ok(BucketList {
            buckets,
            owner: None,
        })
    }

    async fn list_objects(&self, bucket: &str) -> Result<ObjectList> {
        let state = self.begin("ListObjects", Some(bucket), None).await?;
        let stored = state
            .buckets
            .get(bucket)
            .ok_or_else(|| no_such_bucket("ListObjects"))?;

        let objects = stored
            .objects
            .iter()
            .map(|(key, obj)| ObjectMetadata {
                key: key.clone(),
                size: obj.data.len() as i64,
                last_modified: Some(obj.last_modified),
                etag: Some(obj.etag.clone()),
                storage_class: Some("STANDARD".to_string()),
            })
            .collect();

        Ok(ObjectList {
            bucket: bucket.to_string(),
            objects,
            is_truncated: false,
            next_marker: None,
        })
    }

    async fn create_bucket(&self, bucket: &str) -> Result<CreatedBucket> {
        let mut state = self.begin("CreateBucket", Some(bucket), None).await?;

        if state.buckets.contains_key(bucket) {
            return Err(StorageError::service(
                "CreateBucket",
                "BucketAlreadyOwnedByYou",
                "Your previous request to create the named bucket succeeded and you already own it.",
            ));
        }

        state.buckets.insert(bucket.to_string(), MemoryBucket::new());

        Ok(CreatedBucket {
            location: Some(format!("/{}", bucket)),
        })
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut state = self.begin("DeleteBucket", Some(bucket), None).await?;

        match state.buckets.get(bucket) {
            None => return Err(no_such_bucket("DeleteBucket")),
            Some(stored) if !stored.objects.is_empty() => {
                return Err(StorageError::service(
                    "DeleteBucket",
                    "BucketNotEmpty",
                    "The bucket you tried to delete is not empty",
                ))
            }
            Some(_) => {}
        }

        state.buckets.shift_remove(bucket);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<DeletedObject> {
        let mut state = self.begin("DeleteObject", Some(bucket), Some(key)).await?;
        let stored = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket("DeleteObject"))?;

        // Deleting a missing key succeeds, as it does on S3
        stored.objects.shift_remove(key);

        Ok(DeletedObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            delete_marker: false,
            version_id: None,
        })
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<UploadMetadata> {
        let PutObjectRequest {
            bucket,
            key,
            body,
            content_type,
            acl,
        } = request;

        // Drain the body before taking the lock
        let data = body
            .collect()
            .await
            .map_err(|e| StorageError::service("PutObject", "IncompleteBody", e.to_string()))?
            .into_bytes()
            .to_vec();

        let mut state = self.begin("PutObject", Some(&bucket), Some(&key)).await?;
        let request_id = state
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let stored = state
            .buckets
            .get_mut(&bucket)
            .ok_or_else(|| no_such_bucket("PutObject"))?;

        let object = new_object(data, content_type, acl);
        let etag = object.etag.clone();
        stored.objects.insert(key.clone(), object);

        Ok(UploadMetadata {
            status_code: 200,
            request_id: Some(request_id),
            extended_request_id: None,
            etag: Some(etag),
            version_id: None,
            effective_uri: Some(format!("memory://{}/{}", bucket, key)),
        })
    }
}
