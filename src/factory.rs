//! One-call client construction.

use crate::client::{ServiceClient, ServiceClientBuilder};
use crate::config::ClientConfig;
use crate::error::StorageError;

/// Create an authenticated client for `service_name`.
///
/// Explicit keys win over `profile_name`; with neither, credentials come from
/// the environment or the default profile. `endpoint_url` replaces the
/// service's default endpoint (for MinIO, LocalStack and the like) and
/// switches to path-style addressing.
///
/// Without `config`, the region comes from `AWS_REGION` or
/// `AWS_DEFAULT_REGION`, then from the profile's entry in the shared config
/// file (`AWS_CONFIG_FILE` or `~/.aws/config`), then defaults to `us-east-1`;
/// `AWS_ENDPOINT_URL` is honoured the same way.
///
/// No network call is made and no credentials file is read here; the config
/// file is the only thing read. Credential problems surface on the first
/// operation.
///
/// # Example
///
/// ```rust,no_run
/// use s3_bucket::{create_client, BucketClient};
///
/// # async fn run() -> s3_bucket::Result<()> {
/// let client = create_client("s3", Some("dev"), None, None, None, Some("http://localhost:9000"))?;
/// let bucket = BucketClient::new(&client, "artifacts");
/// bucket.upload("build/output.tar.gz", "releases/output.tar.gz").await?;
/// # Ok(())
/// # }
/// ```
pub fn create_client(
    service_name: &str,
    profile_name: Option<&str>,
    access_key_id: Option<&str>,
    secret_access_key: Option<&str>,
    config: Option<ClientConfig>,
    endpoint_url: Option<&str>,
) -> Result<ServiceClient, StorageError> {
    let mut builder = ServiceClientBuilder::new(service_name);

    if let Some(profile) = profile_name {
        builder = builder.profile(profile);
    }
    if let Some(key) = access_key_id {
        builder = builder.access_key_id(key);
    }
    if let Some(secret) = secret_access_key {
        builder = builder.secret_access_key(secret);
    }
    if let Some(config) = config {
        builder = builder.config(config);
    }
    if let Some(endpoint) = endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;

    #[test]
    fn test_create_client_with_explicit_keys() {
        let client = create_client("s3", None, Some("AKID"), Some("SECRET"), None, None).unwrap();
        assert_eq!(client.credentials_source(), "static");
    }

    #[test]
    fn test_create_client_with_profile_and_endpoint() {
        let config = ClientConfig::builder().region("eu-west-1").build().unwrap();
        let client = create_client(
            "s3",
            Some("missing-profile"),
            None,
            None,
            Some(config),
            Some("http://127.0.0.1:4566"),
        )
        .unwrap();

        assert_eq!(client.credentials_source(), "profile");
        assert_eq!(client.config().region, "eu-west-1");
        assert_eq!(
            client.config().endpoint.as_ref().map(|u| u.as_str()),
            Some("http://127.0.0.1:4566/")
        );
    }

    #[test]
    fn test_create_client_requires_service_name() {
        let result = create_client("", None, None, None, None, None);
        assert!(matches!(
            result,
            Err(StorageError::Configuration(ConfigurationError::MissingServiceName))
        ));
    }
}
