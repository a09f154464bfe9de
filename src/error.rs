//! Error types for the Kilat Storage client

use std::path::PathBuf;

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStreamError;
use serde::Serialize;
use thiserror::Error;

/// Client-wide result type
pub type Result<T> = std::result::Result<T, StorageError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where a failed request broke down, as reported by the SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request could not be built
    Construction,
    /// The request timed out
    Timeout,
    /// The request never reached the service (DNS, TLS, connection reset)
    Dispatch,
    /// The service answered with something that could not be parsed
    Response,
    /// The service answered with an error
    Service,
    /// Anything the SDK adds later
    Unknown,
}

impl ErrorKind {
    fn of<E, R>(err: &SdkError<E, R>) -> Self {
        match err {
            SdkError::ConstructionFailure(_) => ErrorKind::Construction,
            SdkError::TimeoutError(_) => ErrorKind::Timeout,
            SdkError::DispatchFailure(_) => ErrorKind::Dispatch,
            SdkError::ResponseError(_) => ErrorKind::Response,
            SdkError::ServiceError(_) => ErrorKind::Service,
            _ => ErrorKind::Unknown,
        }
    }
}

/// Storage client error type
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        kind: ErrorKind,
        /// Service error code, e.g. `AccessDenied` or `NoSuchBucket`
        code: Option<String>,
        /// Human-readable message, e.g. `Access Denied`
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Cannot read upload source {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: ByteStreamError,
    },
}

impl StorageError {
    /// Wrap an SDK failure, keeping its classification and service metadata
    pub(crate) fn from_sdk<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
        R: std::fmt::Debug + Send + Sync + 'static,
    {
        let kind = ErrorKind::of(&err);
        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

        StorageError::Service {
            operation,
            kind,
            code,
            message,
            source: Some(Box::new(err)),
        }
    }

    /// A service-side rejection with no underlying SDK error
    pub(crate) fn service(
        operation: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        StorageError::Service {
            operation,
            kind: ErrorKind::Service,
            code: Some(code.into()),
            message: message.into(),
            source: None,
        }
    }

    /// Message-only view of the error, for callers that only show text
    pub fn message(&self) -> String {
        match self {
            StorageError::Service { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Service error code, when the service sent one
    pub fn code(&self) -> Option<&str> {
        match self {
            StorageError::Service { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// SDK classification of a failed request
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            StorageError::Service { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::operation::create_bucket::CreateBucketError;

    fn service_failure(code: &str, message: &str) -> SdkError<CreateBucketError, ()> {
        let meta = ErrorMetadata::builder().code(code).message(message).build();
        SdkError::service_error(CreateBucketError::generic(meta), ())
    }

    #[test]
    fn test_service_error_keeps_code_and_message() {
        let err = StorageError::from_sdk(
            "CreateBucket",
            service_failure("BucketAlreadyExists", "The requested bucket name is not available"),
        );

        assert_eq!(err.kind(), Some(ErrorKind::Service));
        assert_eq!(err.code(), Some("BucketAlreadyExists"));
        assert_eq!(err.message(), "The requested bucket name is not available");
        assert_eq!(
            err.to_string(),
            "CreateBucket failed: The requested bucket name is not available"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_construction_failure_is_classified() {
        let sdk: SdkError<CreateBucketError, ()> = SdkError::construction_failure("bad input");
        let err = StorageError::from_sdk("CreateBucket", sdk);

        assert_eq!(err.kind(), Some(ErrorKind::Construction));
        assert_eq!(err.code(), None);
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_timeout_is_classified() {
        let sdk: SdkError<CreateBucketError, ()> = SdkError::timeout_error("too slow");
        let err = StorageError::from_sdk("CreateBucket", sdk);

        assert_eq!(err.kind(), Some(ErrorKind::Timeout));
    }

    #[test]
    fn test_message_projection_for_config_errors() {
        let err = StorageError::InvalidConfig("credentials.key is empty".to_string());

        assert_eq!(err.message(), "Invalid configuration: credentials.key is empty");
        assert_eq!(err.kind(), None);
        assert_eq!(err.code(), None);
    }
}
