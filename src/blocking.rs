//! Blocking bucket client.
//!
//! Wraps [`crate::BucketClient`] with a private current-thread runtime so the
//! operations can be called from synchronous code. Do not call these methods
//! from inside an async runtime; use the async client there.

use crate::bucket::BucketClient as AsyncBucketClient;
use crate::client::{ObjectOperations, ServiceClient};
use crate::error::{ConfigurationError, StorageError};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Synchronous counterpart of [`crate::BucketClient`].
pub struct BucketClient<C: ObjectOperations + ?Sized = ServiceClient> {
    client: Arc<C>,
    bucket_name: String,
    runtime: Runtime,
}

impl<C: ObjectOperations + ?Sized> BucketClient<C> {
    /// Bind `client` to `bucket_name` and start the runtime.
    pub fn new(client: Arc<C>, bucket_name: impl Into<String>) -> Result<Self, StorageError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ConfigurationError::InvalidConfiguration {
                field: "runtime".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            bucket_name: bucket_name.into(),
            runtime,
        })
    }

    /// The bound bucket.
    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    fn inner(&self) -> AsyncBucketClient<'_, C> {
        AsyncBucketClient::new(&*self.client, self.bucket_name.as_str())
    }

    /// See [`crate::BucketClient::upload`].
    pub fn upload(&self, file_path: impl AsRef<Path>, key: &str) -> Result<(), StorageError> {
        self.runtime.block_on(self.inner().upload(file_path, key))
    }

    /// See [`crate::BucketClient::download`].
    pub fn download(
        &self,
        key: &str,
        file_path: impl AsRef<Path>,
        exist_ok: bool,
    ) -> Result<(), StorageError> {
        self.runtime
            .block_on(self.inner().download(key, file_path, exist_ok))
    }

    /// See [`crate::BucketClient::key_exists`].
    pub fn key_exists(&self, key: &str) -> Result<bool, StorageError> {
        self.runtime.block_on(self.inner().key_exists(key))
    }
}

impl<C: ObjectOperations + ?Sized> std::fmt::Debug for BucketClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketClient")
            .field("bucket_name", &self.bucket_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocalError;
    use crate::mocks::InMemoryObjectStore;
    use tempfile::tempdir;

    #[test]
    fn test_blocking_round_trip() {
        let store = Arc::new(InMemoryObjectStore::with_buckets(["bucket"]));
        let bucket = BucketClient::new(store.clone(), "bucket").unwrap();
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.txt");
        let target = dir.path().join("out.txt");
        std::fs::write(&source, b"payload").unwrap();

        assert!(!bucket.key_exists("data/in.txt").unwrap());
        bucket.upload(&source, "data/in.txt").unwrap();
        assert!(bucket.key_exists("data/in.txt").unwrap());

        bucket.download("data/in.txt", &target, false).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.get_count(), 1);
    }

    #[test]
    fn test_blocking_download_guard() {
        let store = Arc::new(InMemoryObjectStore::with_buckets(["bucket"]));
        store.insert("bucket", "key", "remote");
        let bucket = BucketClient::new(store.clone(), "bucket").unwrap();
        let dir = tempdir().unwrap();
        let target = dir.path().join("local.txt");
        std::fs::write(&target, b"local").unwrap();

        let err = bucket.download("key", &target, false).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Local(LocalError::DestinationExists { .. })
        ));
        assert_eq!(store.get_count(), 0);

        bucket.download("key", &target, true).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"remote");
        assert_eq!(store.get_count(), 1);
    }
}
