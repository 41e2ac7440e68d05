//! Shared credentials file (profile) provider.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Default profile name.
pub const DEFAULT_PROFILE: &str = "default";

/// AWS profile name environment variable.
pub const AWS_PROFILE: &str = "AWS_PROFILE";

/// AWS credentials file environment variable.
pub const AWS_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

/// AWS shared config file environment variable.
pub const AWS_CONFIG_FILE: &str = "AWS_CONFIG_FILE";

type Profiles = HashMap<String, HashMap<String, String>>;

fn selected_profile(profile_name: Option<&str>) -> String {
    match profile_name {
        Some(name) => name.to_string(),
        None => env::var(AWS_PROFILE).unwrap_or_else(|_| DEFAULT_PROFILE.to_string()),
    }
}

/// `region` of a profile in the shared config file.
///
/// Looks in `config_file`, else `AWS_CONFIG_FILE`, else `~/.aws/config`, under
/// `profile_name`, else `AWS_PROFILE`, else `default`. Any missing piece
/// yields `None`.
pub fn profile_region(profile_name: Option<&str>, config_file: Option<&Path>) -> Option<String> {
    let path = match config_file {
        Some(path) => path.to_path_buf(),
        None => env::var_os(AWS_CONFIG_FILE)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("config")))?,
    };

    let content = std::fs::read_to_string(path).ok()?;
    let mut profiles = parse_profiles(&content);
    profiles
        .remove(&selected_profile(profile_name))?
        .remove("region")
        .filter(|region| !region.is_empty())
}

/// Parse an INI-style profiles file. `[profile name]` headers, as used by
/// the config file, are read as `name`.
fn parse_profiles(content: &str) -> Profiles {
    let mut profiles: Profiles = HashMap::new();
    let mut current_profile: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = header.trim();
            let name = name.strip_prefix("profile ").unwrap_or(name).trim();
            current_profile = Some(name.to_string());
            profiles.entry(name.to_string()).or_default();
            continue;
        }

        if let (Some(profile), Some((key, value))) = (&current_profile, line.split_once('=')) {
            profiles
                .entry(profile.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    profiles
}

/// Credentials provider that reads a named profile from the shared
/// credentials file.
///
/// The file is `~/.aws/credentials` unless overridden by
/// [`with_credentials_file`](Self::with_credentials_file) or
/// `AWS_SHARED_CREDENTIALS_FILE`. Nothing is read until credentials are
/// first requested.
#[derive(Debug, Clone)]
pub struct ProfileCredentialsProvider {
    profile_name: Option<String>,
    credentials_file: Option<PathBuf>,
}

impl ProfileCredentialsProvider {
    /// Use `AWS_PROFILE`, falling back to the default profile.
    pub fn new() -> Self {
        Self {
            profile_name: None,
            credentials_file: None,
        }
    }

    /// Use a specific profile.
    pub fn with_profile(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: Some(profile_name.into()),
            credentials_file: None,
        }
    }

    /// Read from a custom credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    /// The profile this provider will look up.
    pub fn profile_name(&self) -> String {
        selected_profile(self.profile_name.as_deref())
    }

    fn credentials_file_path(&self) -> Result<PathBuf, StorageError> {
        if let Some(path) = &self.credentials_file {
            return Ok(path.clone());
        }

        if let Ok(path) = env::var(AWS_SHARED_CREDENTIALS_FILE) {
            return Ok(PathBuf::from(path));
        }

        dirs::home_dir()
            .map(|home| home.join(".aws").join("credentials"))
            .ok_or_else(|| {
                StorageError::Credentials(CredentialsError::ProfileError {
                    message: "Cannot locate home directory for ~/.aws/credentials".to_string(),
                })
            })
    }

    fn profile_error(message: String) -> StorageError {
        StorageError::Credentials(CredentialsError::ProfileError { message })
    }
}

impl Default for ProfileCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for ProfileCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, StorageError> {
        let path = self.credentials_file_path()?;
        let profile_name = self.profile_name();

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Self::profile_error(format!(
                "Failed to read credentials file at {}: {}",
                path.display(),
                e
            ))
        })?;

        let profiles = parse_profiles(&content);

        let profile = profiles.get(&profile_name).ok_or_else(|| {
            Self::profile_error(format!(
                "Profile '{}' not found in credentials file",
                profile_name
            ))
        })?;

        let access_key_id = profile.get("aws_access_key_id").ok_or_else(|| {
            Self::profile_error(format!(
                "aws_access_key_id not found in profile '{}'",
                profile_name
            ))
        })?;

        let secret_access_key = profile.get("aws_secret_access_key").ok_or_else(|| {
            Self::profile_error(format!(
                "aws_secret_access_key not found in profile '{}'",
                profile_name
            ))
        })?;

        let credentials = match profile.get("aws_session_token") {
            Some(token) => {
                AwsCredentials::with_session_token(access_key_id, secret_access_key, token)
            }
            None => AwsCredentials::new(access_key_id, secret_access_key),
        };

        Ok(credentials)
    }

    fn name(&self) -> &'static str {
        "profile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TWO_PROFILES: &str = r#"
[default]
aws_access_key_id = AKIADEFAULT
aws_secret_access_key = secretdefault

[profile production]
aws_access_key_id = AKIAPROD
aws_secret_access_key = secretprod
aws_session_token = tokenprod
"#;

    fn credentials_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_credentials_file() {
        let profiles = parse_profiles(TWO_PROFILES);

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles["default"]["aws_access_key_id"], "AKIADEFAULT");
        assert_eq!(profiles["production"]["aws_session_token"], "tokenprod");
    }

    #[test]
    fn test_parse_credentials_with_comments() {
        let content = "# comment\n[default]\n; another\naws_access_key_id = AKID\n";
        let profiles = parse_profiles(content);
        assert_eq!(profiles["default"]["aws_access_key_id"], "AKID");
    }

    #[tokio::test]
    async fn test_profile_provider_specific_profile() {
        let file = credentials_file(TWO_PROFILES);
        let provider =
            ProfileCredentialsProvider::with_profile("production").with_credentials_file(file.path());

        let creds = provider.get_credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKIAPROD");
        assert_eq!(creds.session_token(), Some("tokenprod"));
    }

    #[tokio::test]
    async fn test_profile_provider_missing_profile() {
        let file = credentials_file(TWO_PROFILES);
        let provider =
            ProfileCredentialsProvider::with_profile("nonexistent").with_credentials_file(file.path());

        let result = provider.get_credentials().await;
        assert!(matches!(
            result,
            Err(StorageError::Credentials(CredentialsError::ProfileError { .. }))
        ));
    }

    #[tokio::test]
    async fn test_profile_provider_missing_secret() {
        let file = credentials_file("[default]\naws_access_key_id = AKIATEST\n");
        let provider =
            ProfileCredentialsProvider::with_profile("default").with_credentials_file(file.path());

        assert!(provider.get_credentials().await.is_err());
    }

    #[test]
    fn test_profile_region_from_config_file() {
        let file = credentials_file(
            "[default]\nregion = us-west-2\n\n[profile staging]\noutput = json\nregion = eu-west-3\n\n[profile bare]\nregion =\n",
        );

        assert_eq!(
            profile_region(Some("staging"), Some(file.path())).as_deref(),
            Some("eu-west-3")
        );
        assert_eq!(
            profile_region(Some("default"), Some(file.path())).as_deref(),
            Some("us-west-2")
        );
        assert_eq!(profile_region(Some("bare"), Some(file.path())), None);
        assert_eq!(profile_region(Some("absent"), Some(file.path())), None);
        assert_eq!(
            profile_region(Some("default"), Some(Path::new("/nonexistent/aws/config"))),
            None
        );
    }

    #[tokio::test]
    async fn test_profile_provider_missing_file() {
        let provider = ProfileCredentialsProvider::with_profile("default")
            .with_credentials_file("/nonexistent/s3-bucket-client/credentials");

        assert!(provider.get_credentials().await.is_err());
    }
}
