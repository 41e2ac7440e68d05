//! Test doubles.
//!
//! [`MockTransport`], [`MockSigner`] and [`MockCredentialsProvider`] stand in
//! for the HTTP layer; [`InMemoryObjectStore`] implements
//! [`ObjectOperations`] directly for tests that do not care about HTTP.

mod credentials;
mod signer;
mod transport;

pub use credentials::MockCredentialsProvider;
pub use signer::{MockSigner, SignCall};
pub use transport::{MockResponse, MockTransport};

use crate::client::ObjectOperations;
use crate::error::{BucketError, LocalError, ObjectError, StorageError};
use crate::services::validate_location;
use crate::signing::sha256_hex;
use crate::transport::RequestBody;
use crate::types::*;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    e_tag: String,
}

impl StoredObject {
    fn new(body: Bytes) -> Self {
        Self {
            e_tag: format!("\"{}\"", sha256_hex(&body)),
            body,
        }
    }
}

/// In-memory object store keyed by `(bucket, key)`.
///
/// Buckets must be created up front. Failures mirror what the HTTP client
/// reports: GET and PUT on an unknown bucket fail with
/// [`BucketError::NotFound`], while HEAD, whose 404 carries no body, reports
/// every miss as [`ObjectError::NotFound`]. Keys the HTTP client would
/// reject are rejected here too.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    buckets: RwLock<HashSet<String>>,
    objects: RwLock<BTreeMap<(String, String), StoredObject>>,
    puts: AtomicUsize,
    gets: AtomicUsize,
    heads: AtomicUsize,
}

impl InMemoryObjectStore {
    /// Empty store with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given buckets already created.
    pub fn with_buckets<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for bucket in buckets {
            store.create_bucket(bucket);
        }
        store
    }

    /// Create a bucket.
    pub fn create_bucket(&self, bucket: impl Into<String>) {
        self.buckets.write().insert(bucket.into());
    }

    /// Insert an object directly, bypassing the operation counters.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        self.create_bucket(bucket);
        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject::new(body.into()),
        );
    }

    /// Content of a stored object.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
    }

    /// Number of `put_object` calls.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::Relaxed)
    }

    /// Number of `get_object` calls.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::Relaxed)
    }

    /// Number of `head_object` calls.
    pub fn head_count(&self) -> usize {
        self.heads.load(Ordering::Relaxed)
    }

    fn require_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        if self.buckets.read().contains(bucket) {
            return Ok(());
        }
        Err(StorageError::Bucket(BucketError::NotFound {
            bucket: bucket.to_string(),
            request_id: None,
        }))
    }

    fn lookup(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

fn no_such_key(bucket: &str, key: &str) -> StorageError {
    StorageError::Object(ObjectError::NotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
        request_id: None,
    })
}

#[async_trait]
impl ObjectOperations for InMemoryObjectStore {
    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, StorageError> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        validate_location(&request.bucket, &request.key)?;
        self.require_bucket(&request.bucket)?;

        let body = match request.body {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Bytes(bytes) => bytes,
            RequestBody::File { path, .. } => match tokio::fs::read(&path).await {
                Ok(content) => content.into(),
                Err(source) => return Err(StorageError::Local(LocalError::Io { path, source })),
            },
        };

        let object = StoredObject::new(body);
        let e_tag = object.e_tag.clone();
        self.objects
            .write()
            .insert((request.bucket, request.key), object);

        Ok(PutObjectOutput {
            e_tag: Some(e_tag),
            ..Default::default()
        })
    }

    async fn get_object(&self, request: GetObjectRequest) -> Result<GetObjectOutput, StorageError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        validate_location(&request.bucket, &request.key)?;
        self.require_bucket(&request.bucket)?;
        let object = self
            .lookup(&request.bucket, &request.key)
            .ok_or_else(|| no_such_key(&request.bucket, &request.key))?;

        Ok(GetObjectOutput {
            content_length: Some(object.body.len() as u64),
            body: object.body.into(),
            e_tag: Some(object.e_tag),
            ..Default::default()
        })
    }

    async fn head_object(
        &self,
        request: HeadObjectRequest,
    ) -> Result<HeadObjectOutput, StorageError> {
        self.heads.fetch_add(1, Ordering::Relaxed);
        validate_location(&request.bucket, &request.key)?;
        let object = self
            .lookup(&request.bucket, &request.key)
            .ok_or_else(|| no_such_key(&request.bucket, &request.key))?;

        Ok(HeadObjectOutput {
            content_length: Some(object.body.len() as u64),
            e_tag: Some(object.e_tag),
            ..Default::default()
        })
    }
}
