//! Error types for the bucket client.
//!
//! Errors are grouped by where they originate. Everything except
//! [`LocalError`] is reported by (or on the way to) the remote service and is
//! handed back to callers exactly as classified here.

mod mapping;

pub use mapping::{map_http_status, map_s3_error_code, S3ErrorResponse};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Credential-related errors.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// AWS signing errors.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Request validation errors reported by the service.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Bucket-level errors.
    #[error("Bucket error: {0}")]
    Bucket(#[from] BucketError),

    /// Object-level errors.
    #[error("Object error: {0}")]
    Object(#[from] ObjectError),

    /// Access and authorization errors.
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    /// Network and transport errors.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Server-side errors.
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Response decoding errors.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// Local filesystem errors; never produced by the service.
    #[error("Local error: {0}")]
    Local(#[from] LocalError),
}

impl StorageError {
    /// Returns the HTTP status code associated with the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StorageError::Access(_) => Some(403),
            StorageError::Bucket(BucketError::NotFound { .. }) => Some(404),
            StorageError::Object(ObjectError::NotFound { .. }) => Some(404),
            StorageError::Object(ObjectError::PreconditionFailed { .. }) => Some(412),
            StorageError::Object(ObjectError::NotModified { .. }) => Some(304),
            StorageError::Request(_) => Some(400),
            StorageError::Server(ServerError::InternalError { .. }) => Some(500),
            StorageError::Server(ServerError::ServiceUnavailable { .. }) => Some(503),
            StorageError::Server(ServerError::SlowDown { .. }) => Some(503),
            StorageError::Server(ServerError::BadGateway { .. }) => Some(502),
            StorageError::Server(ServerError::UnexpectedStatus { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Returns the S3 error code, if the error came from the service.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            StorageError::Bucket(e) => Some(e.code()),
            StorageError::Object(e) => Some(e.code()),
            StorageError::Access(e) => Some(e.code()),
            StorageError::Server(e) => Some(e.code()),
            _ => None,
        }
    }

    /// Returns the AWS request ID, if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            StorageError::Bucket(e) => e.request_id(),
            StorageError::Object(e) => e.request_id(),
            StorageError::Access(e) => e.request_id(),
            StorageError::Server(e) => e.request_id(),
            _ => None,
        }
    }

    /// True when the service reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Object(ObjectError::NotFound { .. }))
    }

    /// True for errors raised locally, before or after any remote call.
    pub fn is_local(&self) -> bool {
        matches!(self, StorageError::Local(_))
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Service name was empty.
    #[error("Missing service name: a service name is required to build a client")]
    MissingServiceName,

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL '{url}': {details}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Details about the validation error.
        details: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Message text.
        message: String,
    },

    /// Wrong region detected (redirect response).
    #[error("Wrong region: bucket is in region '{correct_region}', not '{configured_region}'")]
    WrongRegion {
        /// The region where the bucket is located.
        correct_region: String,
        /// The region that was configured.
        configured_region: String,
    },
}

/// Credential-related errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found.
    #[error("Credentials not found: no credentials could be loaded from any source")]
    NotFound,

    /// Credentials have expired.
    #[error("Credentials expired: session credentials expired at {expiration}")]
    Expired {
        /// When the credentials expired.
        expiration: String,
    },

    /// Credentials are invalid.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Details about why credentials are invalid.
        message: String,
    },

    /// Profile configuration error.
    #[error("Profile error: {message}")]
    ProfileError {
        /// Details about the profile error.
        message: String,
    },
}

/// AWS Signature V4 signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Signature calculation failed.
    #[error("Signature calculation failed: {message}")]
    CalculationFailed {
        /// Details about the calculation error.
        message: String,
    },
}

/// Request errors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// General validation error.
    #[error("Validation error: {message}")]
    Validation {
        /// Details about the validation error.
        message: String,
    },

    /// Invalid bucket name.
    #[error("Invalid bucket name '{bucket}': {reason}")]
    InvalidBucketName {
        /// The invalid bucket name.
        bucket: String,
        /// Reason why the name is invalid.
        reason: String,
    },

    /// Entity too large.
    #[error("Entity too large: {message}")]
    EntityTooLarge {
        /// Message from the service.
        message: String,
    },
}

/// Bucket-level errors.
#[derive(Debug, Error)]
pub enum BucketError {
    /// Bucket not found.
    #[error("Bucket not found: '{bucket}'")]
    NotFound {
        /// Bucket involved.
        bucket: String,
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },
}

impl BucketError {
    /// Service error code this variant corresponds to.
    pub fn code(&self) -> &str {
        match self {
            BucketError::NotFound { .. } => "NoSuchBucket",
        }
    }

    /// Request id reported by the service.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            BucketError::NotFound { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// Object-level errors.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// Object not found.
    #[error("Object not found: '{bucket}/{key}'")]
    NotFound {
        /// Bucket involved.
        bucket: String,
        /// Key involved.
        key: String,
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },

    /// Precondition failed.
    #[error("Precondition failed for '{bucket}/{key}': {condition}")]
    PreconditionFailed {
        /// Bucket involved.
        bucket: String,
        /// Key involved.
        key: String,
        /// The condition that failed.
        condition: String,
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },

    /// Object not modified (304 response).
    #[error("Object not modified: '{bucket}/{key}'")]
    NotModified {
        /// Bucket involved.
        bucket: String,
        /// Key involved.
        key: String,
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },

    /// Invalid object state (e.g., archived object that must be restored).
    #[error("Invalid object state for '{bucket}/{key}': {message}")]
    InvalidState {
        /// Bucket involved.
        bucket: String,
        /// Key involved.
        key: String,
        /// Message text.
        message: String,
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },
}

impl ObjectError {
    /// Service error code this variant corresponds to.
    pub fn code(&self) -> &str {
        match self {
            ObjectError::NotFound { .. } => "NoSuchKey",
            ObjectError::PreconditionFailed { .. } => "PreconditionFailed",
            ObjectError::NotModified { .. } => "NotModified",
            ObjectError::InvalidState { .. } => "InvalidObjectState",
        }
    }

    /// Request id reported by the service.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ObjectError::NotFound { request_id, .. }
            | ObjectError::PreconditionFailed { request_id, .. }
            | ObjectError::NotModified { request_id, .. }
            | ObjectError::InvalidState { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// Access and authorization errors.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Access denied.
    #[error("Access denied")]
    AccessDenied {
        /// Additional message if available.
        message: Option<String>,
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },

    /// Invalid access key ID.
    #[error("Invalid access key ID")]
    InvalidAccessKeyId {
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },

    /// Signature does not match.
    #[error("Signature does not match")]
    SignatureDoesNotMatch {
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },

    /// Expired token.
    #[error("Token has expired")]
    ExpiredToken {
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },
}

impl AccessError {
    /// Service error code this variant corresponds to.
    pub fn code(&self) -> &str {
        match self {
            AccessError::AccessDenied { .. } => "AccessDenied",
            AccessError::InvalidAccessKeyId { .. } => "InvalidAccessKeyId",
            AccessError::SignatureDoesNotMatch { .. } => "SignatureDoesNotMatch",
            AccessError::ExpiredToken { .. } => "ExpiredToken",
        }
    }

    /// Request id reported by the service.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            AccessError::AccessDenied { request_id, .. }
            | AccessError::InvalidAccessKeyId { request_id }
            | AccessError::SignatureDoesNotMatch { request_id }
            | AccessError::ExpiredToken { request_id } => request_id.as_deref(),
        }
    }
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Message text.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The configured timeout.
        duration: Duration,
    },

    /// TLS/SSL or client initialisation error.
    #[error("TLS error: {message}")]
    TlsError {
        /// Message text.
        message: String,
    },
}

/// Server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Internal server error (500).
    #[error("Internal server error (500)")]
    InternalError {
        /// Message text.
        message: Option<String>,
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },

    /// Service unavailable (503).
    #[error("Service unavailable")]
    ServiceUnavailable {
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },

    /// Slow down (503).
    #[error("Request rate too high (SlowDown)")]
    SlowDown {
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },

    /// Bad gateway (502).
    #[error("Bad gateway")]
    BadGateway {
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },

    /// Any other status or error code the mapping does not know.
    #[error("Unexpected response {status} ({code}): {message}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// S3 error code, or the status as text.
        code: String,
        /// Message text.
        message: String,
        /// `x-amz-request-id` of the failed call.
        request_id: Option<String>,
    },
}

impl ServerError {
    /// Service error code this variant corresponds to.
    pub fn code(&self) -> &str {
        match self {
            ServerError::InternalError { .. } => "InternalError",
            ServerError::ServiceUnavailable { .. } => "ServiceUnavailable",
            ServerError::SlowDown { .. } => "SlowDown",
            ServerError::BadGateway { .. } => "BadGateway",
            ServerError::UnexpectedStatus { code, .. } => code,
        }
    }

    /// Request id reported by the service.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ServerError::InternalError { request_id, .. }
            | ServerError::ServiceUnavailable { request_id }
            | ServerError::SlowDown { request_id }
            | ServerError::BadGateway { request_id }
            | ServerError::UnexpectedStatus { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// Response decoding errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// XML parse error.
    #[error("XML parse error: {message}")]
    XmlParseError {
        /// Message text.
        message: String,
    },

    /// Invalid response format.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Message text.
        message: String,
    },
}

/// Local filesystem errors.
#[derive(Debug, Error)]
pub enum LocalError {
    /// Download destination exists and overwriting was not allowed.
    #[error("File exists: {}", path.display())]
    DestinationExists {
        /// The destination path.
        path: PathBuf,
    },

    /// Reading or writing a local file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}
