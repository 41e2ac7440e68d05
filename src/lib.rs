//! Bucket-scoped access to S3-compatible object storage.
//!
//! Two pieces:
//!
//! - [`create_client`] builds an authenticated [`ServiceClient`] from explicit
//!   keys, a named profile or the environment, with an optional endpoint
//!   override for MinIO, LocalStack and other S3-compatible services.
//! - [`BucketClient`] binds a client to one bucket and offers `upload`,
//!   `download` and `key_exists`.
//!
//! Requests are signed with AWS Signature V4 and sent over `reqwest`. File
//! content is streamed in both directions; large uploads become multipart
//! uploads, and downloads only replace the destination once complete.
//! Diagnostics go through `tracing`; install a subscriber to see them.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use s3_bucket::{create_client, BucketClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), s3_bucket::StorageError> {
//!     let client = create_client("s3", None, None, None, None, None)?;
//!     let bucket = BucketClient::new(&client, "my-bucket");
//!
//!     if !bucket.key_exists("hello.txt").await? {
//!         bucket.upload("hello.txt", "hello.txt").await?;
//!     }
//!     bucket.download("hello.txt", "/tmp/hello.txt", true).await?;
//!     Ok(())
//! }
//! ```
//!
//! Synchronous callers can use [`blocking::BucketClient`] instead.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod blocking;
pub mod bucket;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod mocks;
pub mod services;
pub mod signing;
pub mod transfer;
pub mod transport;
pub mod types;
pub mod xml;

pub use bucket::BucketClient;
pub use client::{ObjectOperations, ServiceClient, ServiceClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use credentials::{
    AwsCredentials, ChainCredentialsProvider, CredentialsProvider, EnvCredentialsProvider,
    ProfileCredentialsProvider, StaticCredentialsProvider,
};
pub use error::{
    AccessError, BucketError, ConfigurationError, CredentialsError, LocalError, NetworkError,
    ObjectError, RequestError, ResponseError, ServerError, SigningError, StorageError,
};
pub use factory::create_client;
pub use services::{MultipartService, ObjectsService};
pub use signing::{AwsSigner, AwsSignerV4};
pub use transport::{
    ByteStream, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, RequestBody,
};
pub use types::{
    CompletedPart, GetObjectOutput, GetObjectRequest, HeadObjectOutput, HeadObjectRequest,
    PutObjectOutput, PutObjectRequest, UploadPartRequest,
};

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, StorageError>;
