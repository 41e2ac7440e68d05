//! Client configuration.
//!
//! [`ClientConfig`] carries the transport tuning handed to the factory:
//! region, endpoint addressing, timeouts, connection pool, TLS settings and
//! the multipart transfer thresholds.

use crate::credentials::profile_region;
use crate::error::{ConfigurationError, StorageError};
use crate::signing::encode_key_path;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

const MIB: u64 = 1024 * 1024;

/// Smallest part the service accepts, except for the last one.
pub const MIN_PART_SIZE: u64 = 5 * MIB;

/// Largest part, and largest single PUT, the service accepts.
pub const MAX_PART_SIZE: u64 = 5 * 1024 * MIB;

/// Transport configuration for a [`ServiceClient`](crate::ServiceClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Signing region, also used to build the default host.
    pub region: String,

    /// Endpoint override, e.g. a MinIO or LocalStack URL.
    pub endpoint: Option<Url>,

    /// Use path-style addressing instead of virtual-hosted style.
    ///
    /// Path-style: `https://s3.region.amazonaws.com/bucket/key`
    /// Virtual-hosted: `https://bucket.s3.region.amazonaws.com/key`
    pub path_style: bool,

    /// Target `dualstack` hosts.
    pub use_dual_stack: bool,

    /// Target `-fips` hosts.
    pub use_fips: bool,

    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,

    /// Longest wait for the response to start or for its next chunk.
    ///
    /// Time spent streaming an upload does not count while chunks keep
    /// flowing.
    pub read_timeout: Duration,

    /// Maximum idle connections kept per host.
    pub max_connections: u32,

    /// How long pooled connections may sit idle.
    pub idle_timeout: Duration,

    /// Reject invalid TLS certificates.
    pub verify_ssl: bool,

    /// Files larger than this are uploaded in parts.
    pub multipart_threshold: u64,

    /// Size of each uploaded part, grown if needed to stay within the
    /// service's part count limit.
    pub multipart_part_size: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            path_style: false,
            use_dual_stack: false,
            use_fips: false,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            max_connections: 100,
            idle_timeout: Duration::from_secs(90),
            verify_ssl: true,
            multipart_threshold: 100 * MIB,
            multipart_part_size: 8 * MIB,
        }
    }
}

impl ClientConfig {
    /// Start from defaults.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Whether requests put the bucket in the path rather than the host.
    ///
    /// A custom endpoint always uses path-style addressing.
    pub fn uses_path_style(&self) -> bool {
        self.path_style || self.endpoint.is_some()
    }

    /// Resolve the base URL for `service`, optionally scoped to a bucket.
    pub fn resolve_endpoint(&self, service: &str, bucket: Option<&str>) -> Result<Url, StorageError> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }

        let host = match (self.use_fips, self.use_dual_stack) {
            (true, true) => format!("{}-fips.dualstack.{}.amazonaws.com", service, self.region),
            (true, false) => format!("{}-fips.{}.amazonaws.com", service, self.region),
            (false, true) => format!("{}.dualstack.{}.amazonaws.com", service, self.region),
            (false, false) => format!("{}.{}.amazonaws.com", service, self.region),
        };

        let url_str = match bucket {
            Some(bucket) if !self.path_style => format!("https://{}.{}", bucket, host),
            _ => format!("https://{}", host),
        };

        Url::parse(&url_str).map_err(|e| {
            StorageError::Configuration(ConfigurationError::InvalidEndpoint {
                url: url_str,
                details: e.to_string(),
            })
        })
    }

    /// Build the request path for an object, percent-encoding the key.
    pub fn build_path(&self, bucket: &str, key: Option<&str>) -> String {
        let key = key.map(encode_key_path);
        if self.uses_path_style() {
            match key {
                Some(k) => format!("/{}/{}", bucket, k),
                None => format!("/{}", bucket),
            }
        } else {
            match key {
                Some(k) => format!("/{}", k),
                None => "/".to_string(),
            }
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    region: Option<String>,
    endpoint: Option<Url>,
    path_style: Option<bool>,
    use_dual_stack: Option<bool>,
    use_fips: Option<bool>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    max_connections: Option<u32>,
    idle_timeout: Option<Duration>,
    verify_ssl: Option<bool>,
    multipart_threshold: Option<u64>,
    multipart_part_size: Option<u64>,
}

impl ClientConfigBuilder {
    /// Empty builder; unset fields take their defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Endpoint override, parsed here.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Result<Self, StorageError> {
        self.endpoint = Some(parse_endpoint(endpoint.into())?);
        Ok(self)
    }

    /// Endpoint override from an already parsed URL.
    pub fn endpoint_url(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Put the bucket in the path even without an endpoint override.
    pub fn path_style(mut self, enabled: bool) -> Self {
        self.path_style = Some(enabled);
        self
    }

    /// Dual-stack hosts.
    pub fn dual_stack(mut self, enabled: bool) -> Self {
        self.use_dual_stack = Some(enabled);
        self
    }

    /// FIPS hosts.
    pub fn fips(mut self, enabled: bool) -> Self {
        self.use_fips = Some(enabled);
        self
    }

    /// Connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Idle read timeout; must be non-zero.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Idle pool size per host.
    pub fn max_connections(mut self, connections: u32) -> Self {
        self.max_connections = Some(connections);
        self
    }

    /// Idle pool timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// TLS certificate verification.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    /// Size above which uploads switch to multipart.
    pub fn multipart_threshold(mut self, threshold: u64) -> Self {
        self.multipart_threshold = Some(threshold);
        self
    }

    /// Part size for multipart uploads, between 5 MiB and 5 GiB.
    pub fn multipart_part_size(mut self, size: u64) -> Self {
        self.multipart_part_size = Some(size);
        self
    }

    /// Take the region of `profile` from the shared config file.
    ///
    /// The file is `config_file`, else `AWS_CONFIG_FILE`, else
    /// `~/.aws/config`; the profile is `profile`, else `AWS_PROFILE`, else
    /// `default`. A region already set on the builder is kept, and a missing
    /// file or entry changes nothing.
    pub fn from_profile(mut self, profile: Option<&str>, config_file: Option<&Path>) -> Self {
        if self.region.is_none() {
            self.region = profile_region(profile, config_file);
        }
        self
    }

    /// Overlay `AWS_REGION`, `AWS_DEFAULT_REGION`, `AWS_ENDPOINT_URL`,
    /// `AWS_USE_FIPS_ENDPOINT`, `AWS_USE_DUALSTACK_ENDPOINT` and
    /// `S3_BUCKET_CLIENT_PATH_STYLE`.
    /// Unparsable values are skipped.
    pub fn from_env(mut self) -> Self {
        let region = ["AWS_REGION", "AWS_DEFAULT_REGION"]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|value| !value.is_empty()));
        if region.is_some() {
            self.region = region;
        }

        if let Ok(endpoint) = std::env::var("AWS_ENDPOINT_URL") {
            if let Ok(url) = Url::parse(&endpoint) {
                self.endpoint = Some(url);
            }
        }

        if let Some(val) = env_flag("AWS_USE_FIPS_ENDPOINT") {
            self.use_fips = Some(val);
        }
        if let Some(val) = env_flag("AWS_USE_DUALSTACK_ENDPOINT") {
            self.use_dual_stack = Some(val);
        }
        if let Some(val) = env_flag("S3_BUCKET_CLIENT_PATH_STYLE") {
            self.path_style = Some(val);
        }

        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<ClientConfig, StorageError> {
        let defaults = ClientConfig::default();

        let region = self.region.unwrap_or(defaults.region);
        if region.trim().is_empty() {
            return Err(StorageError::Configuration(
                ConfigurationError::InvalidConfiguration {
                    field: "region".to_string(),
                    message: "Region must not be empty".to_string(),
                },
            ));
        }

        let read_timeout = self.read_timeout.unwrap_or(defaults.read_timeout);
        if read_timeout.is_zero() {
            return Err(StorageError::Configuration(
                ConfigurationError::InvalidConfiguration {
                    field: "read_timeout".to_string(),
                    message: "Timeout must be greater than zero".to_string(),
                },
            ));
        }

        let multipart_part_size = self
            .multipart_part_size
            .unwrap_or(defaults.multipart_part_size);
        if !(MIN_PART_SIZE..=MAX_PART_SIZE).contains(&multipart_part_size) {
            return Err(StorageError::Configuration(
                ConfigurationError::InvalidConfiguration {
                    field: "multipart_part_size".to_string(),
                    message: format!(
                        "Part size must be between {} and {} bytes",
                        MIN_PART_SIZE, MAX_PART_SIZE
                    ),
                },
            ));
        }

        Ok(ClientConfig {
            region,
            endpoint: self.endpoint,
            path_style: self.path_style.unwrap_or(defaults.path_style),
            use_dual_stack: self.use_dual_stack.unwrap_or(defaults.use_dual_stack),
            use_fips: self.use_fips.unwrap_or(defaults.use_fips),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            read_timeout,
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
            idle_timeout: self.idle_timeout.unwrap_or(defaults.idle_timeout),
            verify_ssl: self.verify_ssl.unwrap_or(defaults.verify_ssl),
            multipart_threshold: self
                .multipart_threshold
                .unwrap_or(defaults.multipart_threshold)
                .min(MAX_PART_SIZE),
            multipart_part_size,
        })
    }
}

/// Parse an endpoint override, mapping failures to a configuration error.
pub(crate) fn parse_endpoint(url: String) -> Result<Url, StorageError> {
    match Url::parse(&url) {
        Ok(parsed) if parsed.has_host() => Ok(parsed),
        Ok(_) => Err(StorageError::Configuration(
            ConfigurationError::InvalidEndpoint {
                url,
                details: "endpoint has no host".to_string(),
            },
        )),
        Err(e) => Err(StorageError::Configuration(
            ConfigurationError::InvalidEndpoint {
                url,
                details: e.to_string(),
            },
        )),
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| v.eq_ignore_ascii_case("true"))
}
