//! Request and response types for the object operations.

use crate::transport::{ByteStream, RequestBody};
use bytes::Bytes;
use std::path::PathBuf;

/// PUT object request.
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Object content.
    pub body: RequestBody,
}

impl PutObjectRequest {
    /// Create a new request with an empty body.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            body: RequestBody::Empty,
        }
    }

    /// Upload buffered bytes.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    /// Upload the contents of a local file of `length` bytes.
    ///
    /// The file is read while the request is sent, never loaded whole.
    pub fn with_file(mut self, path: impl Into<PathBuf>, length: u64) -> Self {
        self.body = RequestBody::File {
            path: path.into(),
            length,
        };
        self
    }
}

/// GET object request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetObjectRequest {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
}

impl GetObjectRequest {
    /// Create a new request.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// HEAD object request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadObjectRequest {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
}

impl HeadObjectRequest {
    /// Create a new request.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// PUT object output.
#[derive(Debug, Clone, Default)]
pub struct PutObjectOutput {
    /// ETag of the stored object.
    pub e_tag: Option<String>,
    /// Version ID, when versioning is enabled.
    pub version_id: Option<String>,
    /// Request id from the response headers.
    pub request_id: Option<String>,
}

/// GET object output.
///
/// The body has not been read yet; drain it to receive the content.
#[derive(Debug, Default)]
pub struct GetObjectOutput {
    /// Object content, delivered in chunks.
    pub body: ByteStream,
    /// Entity tag.
    pub e_tag: Option<String>,
    /// Content length.
    pub content_length: Option<u64>,
    /// Content type.
    pub content_type: Option<String>,
    /// Last modified, as sent by the service.
    pub last_modified: Option<String>,
    /// Request id from the response headers.
    pub request_id: Option<String>,
}

/// HEAD object output.
#[derive(Debug, Clone, Default)]
pub struct HeadObjectOutput {
    /// Entity tag.
    pub e_tag: Option<String>,
    /// Content length.
    pub content_length: Option<u64>,
    /// Content type.
    pub content_type: Option<String>,
    /// Last modified, as sent by the service.
    pub last_modified: Option<String>,
    /// Request id from the response headers.
    pub request_id: Option<String>,
}

/// One part of a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadPartRequest {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Id returned when the upload was created.
    pub upload_id: String,
    /// 1-based position of the part.
    pub part_number: u32,
    /// Part content.
    pub body: Bytes,
}

/// A stored part, as listed when completing an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based position of the part.
    pub part_number: u32,
    /// ETag the service returned for the part.
    pub e_tag: String,
}
