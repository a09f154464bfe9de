//! Kilat Storage
//!
//! A thin client for S3-compatible object storage. [`StorageClient`] is
//! built once from a [`StorageConfig`] and forwards bucket and object
//! operations to the AWS SDK.
//!
//! # Modules
//!
//! - `config`: client settings, loadable from `KILAT_*` environment variables
//! - `storage`: backends (`S3Store` over the SDK, `MemoryStore` for tests)
//! - `client`: the `StorageClient` facade

pub mod client;
pub mod config;
pub mod error;
pub mod storage;

pub use client::StorageClient;
pub use config::{Acl, Credentials, StorageConfig};
pub use error::{ErrorKind, Result, StorageError};
