//! Storage types

use aws_sdk_s3::primitives::{ByteStream, DateTime as SdkDateTime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Acl;

/// Buckets visible to the configured credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketList {
    pub buckets: Vec<BucketSummary>,
    pub owner: Option<Owner>,
}

impl BucketList {
    pub fn names(&self) -> Vec<&str> {
        self.buckets.iter().map(|b| b.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

/// Metadata about a stored object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub storage_class: Option<String>,
}

/// One page of objects as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectList {
    pub bucket: String,
    pub objects: Vec<ObjectMetadata>,
    pub is_truncated: bool,
    pub next_marker: Option<String>,
}

impl ObjectList {
    pub fn keys(&self) -> Vec<&str> {
        self.objects.iter().map(|o| o.key.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBucket {
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedObject {
    pub bucket: String,
    pub key: String,
    pub delete_marker: bool,
    pub version_id: Option<String>,
}

/// Response metadata of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadMetadata {
    /// HTTP status of the PutObject response
    pub status_code: u16,
    pub request_id: Option<String>,
    pub extended_request_id: Option<String>,
    pub etag: Option<String>,
    pub version_id: Option<String>,
    pub effective_uri: Option<String>,
}

/// Upload handed to an [`ObjectStore`](super::ObjectStore)
#[derive(Debug)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: ByteStream,
    pub content_type: Option<String>,
    pub acl: Acl,
}

pub(crate) fn to_chrono(dt: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}
