//! Fixed-bucket wrapper over a service client.

use crate::client::{ObjectOperations, ServiceClient};
use crate::error::{LocalError, StorageError};
use crate::transfer::write_atomically;
use crate::types::{GetObjectRequest, HeadObjectOutput, HeadObjectRequest, PutObjectRequest};
use std::io;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Result of a metadata request, before it is narrowed to a `bool`.
#[derive(Debug)]
enum HeadOutcome {
    Present,
    Absent,
    Failed(StorageError),
}

impl From<Result<HeadObjectOutput, StorageError>> for HeadOutcome {
    fn from(result: Result<HeadObjectOutput, StorageError>) -> Self {
        match result {
            Ok(_) => HeadOutcome::Present,
            Err(e) if e.is_not_found() => HeadOutcome::Absent,
            Err(e) => HeadOutcome::Failed(e),
        }
    }
}

/// Upload, download and existence checks against one bucket.
///
/// The client is borrowed, so many bucket clients can share one
/// [`ServiceClient`]. The bucket name is fixed for the lifetime of the value.
#[derive(Debug)]
pub struct BucketClient<'a, C: ObjectOperations + ?Sized = ServiceClient> {
    client: &'a C,
    bucket_name: String,
}

impl<'a, C: ObjectOperations + ?Sized> BucketClient<'a, C> {
    /// Bind `client` to `bucket_name`.
    pub fn new(client: &'a C, bucket_name: impl Into<String>) -> Self {
        Self {
            client,
            bucket_name: bucket_name.into(),
        }
    }

    /// The bound bucket.
    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// The underlying client.
    pub fn client(&self) -> &'a C {
        self.client
    }

    /// Upload a local file to `key`, replacing any existing object.
    ///
    /// The file is streamed rather than loaded into memory. Files larger than
    /// the client's multipart threshold are sent in parts.
    pub async fn upload(&self, file_path: impl AsRef<Path>, key: &str) -> Result<(), StorageError> {
        let file_path = file_path.as_ref();
        let local_error = |source| {
            StorageError::Local(LocalError::Io {
                path: file_path.to_path_buf(),
                source,
            })
        };

        let metadata = tokio::fs::metadata(file_path).await.map_err(local_error)?;
        if !metadata.is_file() {
            return Err(local_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let request =
            PutObjectRequest::new(&self.bucket_name, key).with_file(file_path, metadata.len());
        match self.client.put_object(request).await {
            Ok(_) => {
                debug!(
                    "Uploaded {} to {}/{}",
                    file_path.display(),
                    self.bucket_name,
                    key
                );
                Ok(())
            }
            Err(e) if e.is_local() => Err(e),
            Err(e) => {
                error!(
                    bucket = %self.bucket_name,
                    key,
                    error = %e,
                    "Failed to upload {}",
                    file_path.display()
                );
                Err(e)
            }
        }
    }

    /// Download `key` into a local file.
    ///
    /// If `file_path` already exists the call fails with
    /// [`LocalError::DestinationExists`] before contacting the service, unless
    /// `exist_ok` is set, in which case the file is replaced. The content is
    /// streamed to a temporary file beside `file_path` and renamed over it
    /// once complete, so a failed download leaves any existing file intact.
    pub async fn download(
        &self,
        key: &str,
        file_path: impl AsRef<Path>,
        exist_ok: bool,
    ) -> Result<(), StorageError> {
        let file_path = file_path.as_ref();

        if tokio::fs::metadata(file_path).await.is_ok() {
            if !exist_ok {
                return Err(StorageError::Local(LocalError::DestinationExists {
                    path: file_path.to_path_buf(),
                }));
            }
            warn!("{} exists and will be overwritten", file_path.display());
        }

        let request = GetObjectRequest::new(&self.bucket_name, key);
        let written = match self.client.get_object(request).await {
            Ok(output) => write_atomically(file_path, output.body).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(bytes) => {
                info!(
                    bytes,
                    "Downloaded {}/{} to {}",
                    self.bucket_name,
                    key,
                    file_path.display()
                );
                Ok(())
            }
            Err(e) if e.is_local() => Err(e),
            Err(e) => {
                error!(
                    bucket = %self.bucket_name,
                    key,
                    error = %e,
                    "Failed to download to {}",
                    file_path.display()
                );
                Err(e)
            }
        }
    }

    /// Whether `key` exists in the bucket.
    ///
    /// A not-found response is `Ok(false)`; every other failure is returned.
    pub async fn key_exists(&self, key: &str) -> Result<bool, StorageError> {
        let request = HeadObjectRequest::new(&self.bucket_name, key);

        match HeadOutcome::from(self.client.head_object(request).await) {
            HeadOutcome::Present => Ok(true),
            HeadOutcome::Absent => Ok(false),
            HeadOutcome::Failed(e) => {
                error!(
                    bucket = %self.bucket_name,
                    key,
                    error = %e,
                    "Failed to check object existence"
                );
                Err(e)
            }
        }
    }
}
