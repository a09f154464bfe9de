//! S3-compatible storage backend
//!
//! Wraps the AWS SDK for S3-compatible storage access.

use std::sync::Arc;

use aws_sdk_s3::{
    config::{Credentials, Region},
    operation::{RequestId, RequestIdExt},
    types::{BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl},
    Client,
};

use crate::config::StorageConfig;
use crate::error::{Result, StorageError};

use super::types::{
    to_chrono, BucketList, BucketSummary, CreatedBucket, DeletedObject, ObjectList,
    ObjectMetadata, Owner, PutObjectRequest, UploadMetadata,
};
use super::ObjectStore;

/// Region that rejects an explicit `LocationConstraint`
const US_EAST_1: &str = "us-east-1";

/// PutObject answers 200 on success; the SDK turns anything else into an error
const PUT_OBJECT_OK: u16 = 200;

/// S3-compatible storage backend
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    config: Arc<StorageConfig>,
}

impl S3Store {
    /// Build the SDK client from configuration. Does not touch the network.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        config.validate()?;

        let credentials = Credentials::new(
            &config.credentials.key,
            &config.credentials.secret,
            None,
            None,
            "kilat-storage",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(config.behavior_version()?)
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style)
            .build();

        tracing::debug!(
            endpoint = %config.endpoint,
            region = %config.region,
            path_style = config.force_path_style,
            "Configured S3 client"
        );

        Ok(Self::from_client(Client::from_conf(s3_config), config))
    }

    /// Use an already built SDK client with this configuration
    pub fn from_client(client: Client, config: &StorageConfig) -> Self {
        Self {
            client,
            config: Arc::new(config.clone()),
        }
    }

    /// The underlying SDK client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    async fn list_buckets(&self) -> Result<BucketList> {
        let response = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("ListBuckets", e))?;

        let buckets = response
            .buckets()
            .iter()
            .map(|bucket| BucketSummary {
                name: bucket.name().unwrap_or_default().to_string(),
                creation_date: bucket.creation_date().and_then(to_chrono),
            })
            .collect();

        let owner = response.owner().map(|owner| Owner {
            id: owner.id().map(|s| s.to_string()),
            display_name: owner.display_name().map(|s| s.to_string()),
        });

        Ok(BucketList { buckets, owner })
    }

    async fn list_objects(&self, bucket: &str) -> Result<ObjectList> {
        let response = self
            .client
            .list_objects()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("ListObjects", e))?;

        let objects = response
            .contents()
            .iter()
            .map(|obj| ObjectMetadata {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or(0),
                last_modified: obj.last_modified().and_then(to_chrono),
                etag: obj.e_tag().map(|s| s.to_string()),
                storage_class: obj.storage_class().map(|c| c.as_str().to_string()),
            })
            .collect();

        Ok(ObjectList {
            bucket: bucket.to_string(),
            objects,
            is_truncated: response.is_truncated().unwrap_or(false),
            next_marker: response.next_marker().map(|s| s.to_string()),
        })
    }

    async fn create_bucket(&self, bucket: &str) -> Result<CreatedBucket> {
        let mut request = self.client.create_bucket().bucket(bucket);

        if self.config.region != US_EAST_1 {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.config.region.as_str()))
                    .build(),
            );
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("CreateBucket", e))?;

        Ok(CreatedBucket {
            location: response.location().map(|s| s.to_string()),
        })
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("DeleteBucket", e))?;

        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<DeletedObject> {
        let response = self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("DeleteObject", e))?;

        Ok(DeletedObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            delete_marker: response.delete_marker().unwrap_or(false),
            version_id: response.version_id().map(|s| s.to_string()),
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

        let response = self
            .client
            .put_object()
            .bucket(&bucket)
            .key(&key)
            .body(body)
            .acl(ObjectCannedAcl::from(acl.as_str()))
            .set_content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("PutObject", e))?;

        Ok(UploadMetadata {
            status_code: PUT_OBJECT_OK,
            request_id: response.request_id().map(|s| s.to_string()),
            extended_request_id: response.extended_request_id().map(|s| s.to_string()),
            etag: response.e_tag().map(|s| s.to_string()),
            version_id: response.version_id().map(|s| s.to_string()),
            effective_uri: Some(self.config.object_url(&bucket, &key)),
        })
    }
}
