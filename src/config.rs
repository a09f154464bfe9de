//! Configuration for the Kilat Storage client

use std::env;
use std::fmt;
use std::str::FromStr;

use aws_config::BehaviorVersion;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

pub const DEFAULT_VERSION: &str = "latest";
pub const DEFAULT_REGION: &str = "id-jkt-1";
pub const DEFAULT_ENDPOINT: &str = "https://s3-id-jkt-1.kilatstorage.id/";

/// S3 API version accepted as an alias of `latest`
const S3_API_VERSION: &str = "2006-03-01";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub version: String,
    pub region: String,
    pub acl: Acl,
    pub endpoint: String,
    pub credentials: Credentials,
    /// Address buckets as `endpoint/bucket/key` instead of `bucket.endpoint/key`
    pub force_path_style: bool,
}

/// Access key pair
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Canned ACL applied to uploaded objects
///
/// See <https://docs.aws.amazon.com/AmazonS3/latest/dev/acl-overview.html>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    Private,
    #[default]
    PublicRead,
    PublicReadWrite,
    AwsExecRead,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
    LogDeliveryWrite,
}

impl Acl {
    pub const ALL: [Acl; 8] = [
        Acl::Private,
        Acl::PublicRead,
        Acl::PublicReadWrite,
        Acl::AwsExecRead,
        Acl::AuthenticatedRead,
        Acl::BucketOwnerRead,
        Acl::BucketOwnerFullControl,
        Acl::LogDeliveryWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AwsExecRead => "aws-exec-read",
            Acl::AuthenticatedRead => "authenticated-read",
            Acl::BucketOwnerRead => "bucket-owner-read",
            Acl::BucketOwnerFullControl => "bucket-owner-full-control",
            Acl::LogDeliveryWrite => "log-delivery-write",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Acl {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Acl::ALL
            .into_iter()
            .find(|acl| acl.as_str() == s)
            .ok_or_else(|| StorageError::InvalidConfig(format!("unknown ACL: {}", s)))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            version: DEFAULT_VERSION.to_string(),
            region: DEFAULT_REGION.to_string(),
            acl: Acl::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: Credentials::default(),
            force_path_style: true,
        }
    }
}

impl StorageConfig {
    /// Default configuration with the given access key pair
    pub fn with_credentials(key: impl Into<String>, secret: impl Into<String>) -> Self {
        StorageConfig {
            credentials: Credentials::new(key, secret),
            ..Default::default()
        }
    }

    /// Load configuration from `KILAT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| StorageError::InvalidConfig(format!("{} is not set", name)))
        };

        let acl = match lookup("KILAT_ACL") {
            Some(acl) => acl.parse()?,
            None => Acl::default(),
        };

        let force_path_style = match lookup("KILAT_FORCE_PATH_STYLE").as_deref() {
            None => true,
            Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(other) => {
                return Err(StorageError::InvalidConfig(format!(
                    "KILAT_FORCE_PATH_STYLE must be true or false, got {}",
                    other
                )))
            }
        };

        Ok(StorageConfig {
            version: lookup("KILAT_VERSION").unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            region: lookup("KILAT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            acl,
            endpoint: lookup("KILAT_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            credentials: Credentials {
                key: required("KILAT_ACCESS_KEY")?,
                secret: required("KILAT_SECRET_KEY")?,
            },
            force_path_style,
        })
    }

    /// Reject configurations the SDK client cannot be built from
    pub fn validate(&self) -> Result<()> {
        if self.credentials.key.trim().is_empty() {
            return Err(StorageError::InvalidConfig("credentials.key is empty".to_string()));
        }
        if self.credentials.secret.trim().is_empty() {
            return Err(StorageError::InvalidConfig("credentials.secret is empty".to_string()));
        }
        if self.region.trim().is_empty() {
            return Err(StorageError::InvalidConfig("region is empty".to_string()));
        }
        if split_endpoint(&self.endpoint).is_none() {
            return Err(StorageError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        self.behavior_version().map(|_| ())
    }

    /// SDK behavior version for the configured `version`
    pub fn behavior_version(&self) -> Result<BehaviorVersion> {
        match self.version.as_str() {
            DEFAULT_VERSION | S3_API_VERSION => Ok(BehaviorVersion::latest()),
            other => Err(StorageError::InvalidConfig(format!(
                "unsupported version: {}",
                other
            ))),
        }
    }

    /// URL an object is reachable at through the configured endpoint
    ///
    /// Each `/`-separated segment of the key is percent-encoded, the
    /// separators are kept.
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        let key = encode_key(key);
        match split_endpoint(&self.endpoint) {
            Some((scheme, host)) if !self.force_path_style => {
                format!("{}://{}.{}/{}", scheme, bucket, host, key)
            }
            _ => format!(
                "{}/{}/{}",
                self.endpoint.trim_end_matches('/'),
                urlencoding::encode(bucket),
                key
            ),
        }
    }
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split `https://host/` into `("https", "host")`
fn split_endpoint(endpoint: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = endpoint.split_once("://")?;
    if scheme != "http" && scheme != "https" {
        return None;
    }
    let host = rest.trim_end_matches('/');
    if host.is_empty() {
        return None;
    }
    Some((scheme, host))
}
