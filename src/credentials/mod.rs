//! Credential types and providers.
//!
//! Credentials are resolved lazily: a provider is only consulted when a
//! request is signed, so building a client never touches the environment or
//! the shared credentials file.

mod chain;
mod env;
mod profile;

pub use chain::ChainCredentialsProvider;
pub use env::{EnvCredentialsProvider, AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN};
pub use profile::{
    profile_region, ProfileCredentialsProvider, AWS_CONFIG_FILE, AWS_PROFILE,
    AWS_SHARED_CREDENTIALS_FILE, DEFAULT_PROFILE,
};

use crate::error::{CredentialsError, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// An access key pair, optionally with a session token and expiry.
///
/// The secret half and the token are held in [`SecretString`] and never
/// appear in `Debug` output.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
    expiration: Option<DateTime<Utc>>,
}

impl AwsCredentials {
    /// Long-term key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: None,
            expiration: None,
        }
    }

    /// Key pair plus session token, with no known expiry.
    pub fn with_session_token(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        let mut credentials = Self::new(access_key_id, secret_access_key);
        credentials.session_token = Some(SecretString::new(session_token.into()));
        credentials
    }

    /// Session credentials that stop working at `expiration`.
    pub fn temporary(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        let mut credentials =
            Self::with_session_token(access_key_id, secret_access_key, session_token);
        credentials.expiration = Some(expiration);
        credentials
    }

    /// The access key id.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret key. Do not log the returned value.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// The session token.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token
            .as_ref()
            .map(|token| token.expose_secret().as_str())
    }

    /// When the credentials stop working, if known.
    pub fn expiration(&self) -> Option<&DateTime<Utc>> {
        self.expiration.as_ref()
    }

    fn expired_at(&self, instant: DateTime<Utc>) -> bool {
        self.expiration.map_or(false, |expiration| instant >= expiration)
    }

    /// Whether the expiry, if any, has passed.
    pub fn is_expired(&self) -> bool {
        self.expired_at(Utc::now())
    }

    /// Whether the credentials will have expired `window` from now.
    pub fn will_expire_within(&self, window: Duration) -> bool {
        self.expired_at(Utc::now() + window)
    }

    /// Reject empty halves and expired session credentials.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        let missing = match (
            self.access_key_id.is_empty(),
            self.secret_access_key().is_empty(),
        ) {
            (true, true) => Some("access key id and secret access key are empty"),
            (true, false) => Some("access key id is empty"),
            (false, true) => Some("secret access key is empty"),
            (false, false) => None,
        };
        if let Some(message) = missing {
            return Err(CredentialsError::Invalid {
                message: message.to_string(),
            });
        }

        if let Some(expiration) = self.expiration.filter(|_| self.is_expired()) {
            return Err(CredentialsError::Expired {
                expiration: expiration.to_rfc3339(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HIDDEN: &str = "[REDACTED]";
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &HIDDEN)
            .field("session_token", &self.session_token.as_ref().map(|_| HIDDEN))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Source of credentials for request signing.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Resolve credentials. Called once per signed request.
    async fn get_credentials(&self) -> Result<AwsCredentials, StorageError>;

    /// Short name shown in logs and by `ServiceClient::credentials_source`.
    fn name(&self) -> &'static str;
}

/// Credentials passed in explicitly by the caller.
///
/// The pair is checked when first used, so a missing half fails the first
/// operation rather than client construction.
pub struct StaticCredentialsProvider {
    credentials: AwsCredentials,
}

impl StaticCredentialsProvider {
    /// Wrap fixed credentials.
    pub fn new(credentials: AwsCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, StorageError> {
        self.credentials.validate()?;
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

impl fmt::Debug for StaticCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticCredentialsProvider")
            .field(&self.credentials)
            .finish()
    }
}
