//! Ordered fallback across several credential providers.

use super::{AwsCredentials, CredentialsProvider, EnvCredentialsProvider, ProfileCredentialsProvider};
use crate::error::{CredentialsError, StorageError};
use async_trait::async_trait;
use chrono::Duration;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

const DEFAULT_REFRESH_WINDOW_SECS: i64 = 300;

/// Tries each provider in turn and keeps the first credentials found.
///
/// [`ChainCredentialsProvider::new`] consults the environment first, then the
/// shared credentials file (profile from `AWS_PROFILE`, else `default`).
/// The winning credentials are reused until they come within the refresh
/// window of their expiry.
pub struct ChainCredentialsProvider {
    providers: Vec<Arc<dyn CredentialsProvider>>,
    cache: RwLock<Option<(AwsCredentials, &'static str)>>,
    refresh_window: Duration,
}

impl ChainCredentialsProvider {
    /// Environment, then default profile.
    pub fn new() -> Self {
        Self::with_providers(vec![
            Arc::new(EnvCredentialsProvider::new()),
            Arc::new(ProfileCredentialsProvider::new()),
        ])
    }

    /// Chain over `providers`, in order.
    pub fn with_providers(providers: Vec<Arc<dyn CredentialsProvider>>) -> Self {
        Self {
            providers,
            cache: RwLock::new(None),
            refresh_window: Duration::seconds(DEFAULT_REFRESH_WINDOW_SECS),
        }
    }

    /// Re-resolve once cached credentials are within `seconds` of expiring.
    pub fn with_refresh_buffer(self, seconds: i64) -> Self {
        Self {
            refresh_window: Duration::seconds(seconds),
            ..self
        }
    }

    fn cached(&self) -> Option<AwsCredentials> {
        let cache = self.cache.read();
        let (credentials, source) = cache.as_ref()?;
        if credentials.will_expire_within(self.refresh_window) {
            return None;
        }
        trace!(source, "Reusing cached credentials");
        Some(credentials.clone())
    }

    async fn resolve(&self) -> Result<(AwsCredentials, &'static str), StorageError> {
        let mut last_error = None;

        for provider in &self.providers {
            let source = provider.name();
            match provider.get_credentials().await {
                Ok(credentials) => {
                    debug!(source, "Resolved credentials");
                    return Ok((credentials, source));
                }
                Err(e) => {
                    trace!(source, error = %e, "Credentials provider skipped");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(StorageError::Credentials(CredentialsError::NotFound)))
    }
}

impl Default for ChainCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for ChainCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, StorageError> {
        if let Some(credentials) = self.cached() {
            return Ok(credentials);
        }

        let (credentials, source) = self.resolve().await?;
        *self.cache.write() = Some((credentials.clone(), source));
        Ok(credentials)
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl std::fmt::Debug for ChainCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("ChainCredentialsProvider")
            .field("providers", &names)
            .field("refresh_window", &self.refresh_window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockCredentialsProvider;
    use chrono::Utc;

    #[tokio::test]
    async fn test_first_provider_with_credentials_wins() {
        let empty = Arc::new(MockCredentialsProvider::empty());
        let found = Arc::new(MockCredentialsProvider::with_credentials(AwsCredentials::new(
            "AKID", "SECRET",
        )));
        let unused = Arc::new(MockCredentialsProvider::new());
        let providers: Vec<Arc<dyn CredentialsProvider>> =
            vec![empty.clone(), found.clone(), unused.clone()];
        let chain = ChainCredentialsProvider::with_providers(providers);

        let credentials = chain.get_credentials().await.unwrap();

        assert_eq!(credentials.access_key_id(), "AKID");
        assert_eq!((empty.call_count(), found.call_count(), unused.call_count()), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_long_term_credentials_are_cached() {
        let inner = Arc::new(MockCredentialsProvider::new());
        let chain = ChainCredentialsProvider::with_providers(vec![inner.clone()]);

        for _ in 0..3 {
            chain.get_credentials().await.unwrap();
        }

        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_credentials_inside_refresh_window_are_resolved_again() {
        let expiring =
            AwsCredentials::temporary("AKID", "SECRET", "TOKEN", Utc::now() + Duration::seconds(60));
        let inner = Arc::new(MockCredentialsProvider::with_credentials(expiring));
        let chain = ChainCredentialsProvider::with_providers(vec![inner.clone()]).with_refresh_buffer(120);

        chain.get_credentials().await.unwrap();
        chain.get_credentials().await.unwrap();

        assert_eq!(inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_last_error_is_returned() {
        let chain = ChainCredentialsProvider::with_providers(vec![
            Arc::new(MockCredentialsProvider::empty()),
            Arc::new(crate::credentials::StaticCredentialsProvider::new(AwsCredentials::new("", ""))),
        ]);

        assert!(matches!(
            chain.get_credentials().await,
            Err(StorageError::Credentials(CredentialsError::Invalid { .. }))
        ));
    }

    #[tokio::test]
    async fn test_empty_chain_reports_not_found() {
        let chain = ChainCredentialsProvider::with_providers(Vec::new());

        assert!(matches!(
            chain.get_credentials().await,
            Err(StorageError::Credentials(CredentialsError::NotFound))
        ));
    }
}
