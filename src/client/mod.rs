//! Authenticated service client.
//!
//! [`ServiceClient`] is the handle the factory returns. It owns the resolved
//! configuration, the HTTP transport and a SigV4 signer, and implements
//! [`ObjectOperations`], the capability [`BucketClient`](crate::BucketClient)
//! is written against.

use crate::config::{parse_endpoint, ClientConfig};
use crate::credentials::{
    AwsCredentials, ChainCredentialsProvider, CredentialsProvider, EnvCredentialsProvider,
    ProfileCredentialsProvider, StaticCredentialsProvider,
};
use crate::error::{ConfigurationError, StorageError};
use crate::services::{MultipartService, ObjectsService};
use crate::signing::AwsSignerV4;
use crate::transport::{HttpTransport, ReqwestTransport, RequestBody};
use crate::types::*;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// The object operations a bucket wrapper needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectOperations: Send + Sync {
    /// Store an object, replacing any existing one under the same key.
    ///
    /// Large file bodies may be sent as a multipart upload.
    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, StorageError>;

    /// Fetch an object's content.
    async fn get_object(&self, request: GetObjectRequest) -> Result<GetObjectOutput, StorageError>;

    /// Fetch an object's metadata only.
    async fn head_object(&self, request: HeadObjectRequest)
        -> Result<HeadObjectOutput, StorageError>;
}

/// Authenticated client for an S3-compatible service.
///
/// Immutable after construction and cheap to share: wrap it in an `Arc` or
/// borrow it from any number of bucket clients.
pub struct ServiceClient {
    config: Arc<ClientConfig>,
    service_name: String,
    credentials_source: &'static str,
    objects: ObjectsService,
    multipart: MultipartService,
}

impl ServiceClient {
    /// Start building a client for `service_name` (for example `"s3"`).
    pub fn builder(service_name: impl Into<String>) -> ServiceClientBuilder {
        ServiceClientBuilder::new(service_name)
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The service this client signs for.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Name of the credentials provider in use.
    pub fn credentials_source(&self) -> &'static str {
        self.credentials_source
    }

    /// The underlying objects service.
    pub fn objects(&self) -> &ObjectsService {
        &self.objects
    }

    /// The underlying multipart service.
    pub fn multipart(&self) -> &MultipartService {
        &self.multipart
    }
}

#[async_trait]
impl ObjectOperations for ServiceClient {
    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, StorageError> {
        if let RequestBody::File { path, length } = &request.body {
            if *length > self.config.multipart_threshold {
                return self
                    .multipart
                    .upload_file(&request.bucket, &request.key, path, *length)
                    .await;
            }
        }
        self.objects.put(request).await
    }

    async fn get_object(&self, request: GetObjectRequest) -> Result<GetObjectOutput, StorageError> {
        self.objects.get(request).await
    }

    async fn head_object(
        &self,
        request: HeadObjectRequest,
    ) -> Result<HeadObjectOutput, StorageError> {
        self.objects.head(request).await
    }
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("service_name", &self.service_name)
            .field("credentials_source", &self.credentials_source)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ServiceClient`].
///
/// Credentials are chosen in this order:
/// 1. an explicit provider set with [`credentials_provider`](Self::credentials_provider);
/// 2. an access key id and/or secret key set with [`credentials`](Self::credentials);
/// 3. a named shared-credentials profile set with [`profile`](Self::profile);
/// 4. the default chain: environment, then `AWS_PROFILE` or `default`.
///
/// Without an explicit [`config`](Self::config), the region comes from
/// `AWS_REGION` or `AWS_DEFAULT_REGION`, then the profile's `region` in the
/// shared config file, then `us-east-1`. That file is the only thing read at
/// build time; credentials are resolved on first use.
pub struct ServiceClientBuilder {
    service_name: String,
    profile: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
    credentials_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    config: Option<ClientConfig>,
    endpoint_url: Option<String>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl ServiceClientBuilder {
    /// Create a new builder.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            profile: None,
            access_key_id: None,
            secret_access_key: None,
            credentials_provider: None,
            credentials_file: None,
            config_file: None,
            config: None,
            endpoint_url: None,
            transport: None,
        }
    }

    /// Use a named profile from the shared credentials file.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Use an explicit access key id.
    pub fn access_key_id(mut self, access_key_id: impl Into<String>) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self
    }

    /// Use an explicit secret access key.
    pub fn secret_access_key(mut self, secret_access_key: impl Into<String>) -> Self {
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Use an explicit key pair.
    pub fn credentials(
        self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id(access_key_id)
            .secret_access_key(secret_access_key)
    }

    /// Use a custom credentials provider.
    pub fn credentials_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    /// Read profiles from this file instead of `~/.aws/credentials`.
    pub fn credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    /// Read the profile's region from this file instead of `~/.aws/config`.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Use the provided transport configuration, skipping the environment
    /// and config file.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Send requests to this endpoint instead of the default one.
    ///
    /// Implies path-style addressing.
    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Use a custom HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    fn profile_provider(&self, profile: Option<&str>) -> ProfileCredentialsProvider {
        let provider = match profile {
            Some(name) => ProfileCredentialsProvider::with_profile(name),
            None => ProfileCredentialsProvider::new(),
        };
        match &self.credentials_file {
            Some(path) => provider.with_credentials_file(path.clone()),
            None => provider,
        }
    }

    fn resolve_credentials_provider(&mut self) -> Arc<dyn CredentialsProvider> {
        if let Some(provider) = self.credentials_provider.take() {
            return provider;
        }

        if self.access_key_id.is_some() || self.secret_access_key.is_some() {
            // A missing half stays empty and is rejected when first used.
            let credentials = AwsCredentials::new(
                self.access_key_id.take().unwrap_or_default(),
                self.secret_access_key.take().unwrap_or_default(),
            );
            return Arc::new(StaticCredentialsProvider::new(credentials));
        }

        if let Some(profile) = self.profile.clone() {
            return Arc::new(self.profile_provider(Some(&profile)));
        }

        Arc::new(ChainCredentialsProvider::with_providers(vec![
            Arc::new(EnvCredentialsProvider::new()),
            Arc::new(self.profile_provider(None)),
        ]))
    }

    /// Build the client.
    ///
    /// Fails only for an empty service name, an unparsable endpoint URL, an
    /// invalid configuration, or an HTTP client that cannot be initialised.
    pub fn build(mut self) -> Result<ServiceClient, StorageError> {
        let service_name = self.service_name.trim().to_string();
        if service_name.is_empty() {
            return Err(StorageError::Configuration(
                ConfigurationError::MissingServiceName,
            ));
        }

        let mut config = match self.config.take() {
            Some(config) => config,
            None => ClientConfig::builder()
                .from_profile(self.profile.as_deref(), self.config_file.as_deref())
                .from_env()
                .build()?,
        };
        if let Some(endpoint_url) = self.endpoint_url.take() {
            config.endpoint = Some(parse_endpoint(endpoint_url)?);
        }

        let transport: Arc<dyn HttpTransport> = match self.transport.take() {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config)?),
        };

        let provider = self.resolve_credentials_provider();
        let credentials_source = provider.name();
        let signer = Arc::new(AwsSignerV4::new(provider, &config.region, &service_name));

        debug!(
            service = %service_name,
            region = %config.region,
            endpoint = ?config.endpoint.as_ref().map(|u| u.as_str()),
            credentials = credentials_source,
            "Created service client"
        );

        let config = Arc::new(config);
        let objects = ObjectsService::new(
            config.clone(),
            transport.clone(),
            signer.clone(),
            &service_name,
        );
        let multipart = MultipartService::new(config.clone(), transport, signer, &service_name);

        Ok(ServiceClient {
            config,
            service_name,
            credentials_source,
            objects,
            multipart,
        })
    }
}

impl std::fmt::Debug for ServiceClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClientBuilder")
            .field("service_name", &self.service_name)
            .field("profile", &self.profile)
            .field("access_key_id", &self.access_key_id)
            .field("endpoint_url", &self.endpoint_url)
            .finish_non_exhaustive()
    }
}
