//! AWS Signature V4 signing.
//!
//! Requests are signed for the service name the client was created with, so
//! the same code signs for `s3` or any S3-compatible service scope.

mod canonical;
mod signer;

pub use canonical::{encode_key_path, encode_query_value};
pub use signer::{AwsSigner, AwsSignerV4, SignedRequest};

use crate::credentials::AwsCredentials;
use crate::error::SigningError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// AWS Signature V4 algorithm identifier.
pub const AWS_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// `x-amz-content-sha256` value for a body that is streamed unhashed.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// The body a signature commits to.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// Buffered bytes, hashed into the signature. Empty for bodiless requests.
    Bytes(&'a [u8]),
    /// A body streamed from disk; signed as [`UNSIGNED_PAYLOAD`].
    Unsigned,
}

impl Payload<'static> {
    /// No body.
    pub const EMPTY: Self = Payload::Bytes(&[]);
}

impl Payload<'_> {
    /// The `x-amz-content-sha256` value.
    pub fn hash(&self) -> String {
        match self {
            Payload::Bytes(bytes) => sha256_hex(bytes),
            Payload::Unsigned => UNSIGNED_PAYLOAD.to_string(),
        }
    }

    /// Whether any body goes with the request.
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Bytes(bytes) if bytes.is_empty())
    }
}

/// Calculate SHA-256 hash of data as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Calculate HMAC-SHA256.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| SigningError::CalculationFailed {
            message: e.to_string(),
        })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the signing key.
///
/// kDate = HMAC("AWS4" + SecretKey, Date)
/// kRegion = HMAC(kDate, Region)
/// kService = HMAC(kRegion, Service)
/// kSigning = HMAC(kService, "aws4_request")
pub fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Build the credential scope: `{date}/{region}/{service}/aws4_request`.
pub fn build_credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, service)
}

/// Format a timestamp as `YYYYMMDD'T'HHMMSS'Z'`.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format a date stamp as `YYYYMMDD`.
pub fn format_date_stamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}

/// Check if a header should be signed.
pub fn should_sign_header(header_name: &str) -> bool {
    let name_lower = header_name.to_lowercase();

    name_lower == "host"
        || name_lower.starts_with("x-amz-")
        || name_lower == "content-type"
        || name_lower == "content-md5"
        || name_lower == "content-length"
}

/// Inputs to a single signature calculation.
#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Request path, already percent-encoded.
    pub uri: &'a str,
    /// Raw query string without the leading `?`.
    pub query_string: &'a str,
    /// Headers to consider for signing.
    pub headers: &'a [(String, String)],
    /// Hex SHA-256 of the payload.
    pub payload_hash: &'a str,
    /// Signing region.
    pub region: &'a str,
    /// Signing service name.
    pub service: &'a str,
    /// Request timestamp.
    pub timestamp: &'a DateTime<Utc>,
}

/// Sign a request and return the Authorization header value.
pub fn sign_request(
    params: &SigningParams<'_>,
    credentials: &AwsCredentials,
) -> Result<String, SigningError> {
    let date_stamp = format_date_stamp(params.timestamp);
    let amz_date = format_datetime(params.timestamp);

    let canonical_request = canonical::build_canonical_request(
        params.method,
        params.uri,
        params.query_string,
        params.headers,
        params.payload_hash,
    );

    let credential_scope = build_credential_scope(&date_stamp, params.region, params.service);

    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        AWS_ALGORITHM,
        amz_date,
        credential_scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(
        credentials.secret_access_key(),
        &date_stamp,
        params.region,
        params.service,
    )?;
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        AWS_ALGORITHM,
        credentials.access_key_id(),
        credential_scope,
        canonical::build_signed_headers(params.headers),
        signature
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex(b"test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_payload_hash() {
        assert_eq!(Payload::EMPTY.hash(), sha256_hex(b""));
        assert!(Payload::EMPTY.is_empty());
        assert_eq!(Payload::Unsigned.hash(), "UNSIGNED-PAYLOAD");
        assert!(!Payload::Unsigned.is_empty());
    }

    #[test]
    fn test_derive_signing_key_known_vector() {
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_build_credential_scope() {
        let scope = build_credential_scope("20231215", "us-east-1", "s3");
        assert_eq!(scope, "20231215/us-east-1/s3/aws4_request");
    }

    #[test]
    fn test_format_timestamps() {
        let dt = Utc.with_ymd_and_hms(2023, 12, 15, 10, 30, 45).unwrap();
        assert_eq!(format_datetime(&dt), "20231215T103045Z");
        assert_eq!(format_date_stamp(&dt), "20231215");
    }

    #[test]
    fn test_should_sign_header() {
        assert!(should_sign_header("Host"));
        assert!(should_sign_header("x-amz-date"));
        assert!(should_sign_header("X-Amz-Content-Sha256"));
        assert!(should_sign_header("Content-Type"));
        assert!(!should_sign_header("User-Agent"));
        assert!(!should_sign_header("Accept"));
    }

    #[test]
    fn test_sign_request_scope_follows_service() {
        let timestamp = Utc.with_ymd_and_hms(2023, 12, 15, 10, 30, 45).unwrap();
        let headers = vec![("host".to_string(), "storage.example.com".to_string())];
        let payload_hash = sha256_hex(b"");
        let credentials = AwsCredentials::new("AKID", "SECRET");

        let params = SigningParams {
            method: "HEAD",
            uri: "/bucket/key",
            query_string: "",
            headers: &headers,
            payload_hash: &payload_hash,
            region: "eu-central-1",
            service: "storage",
            timestamp: &timestamp,
        };

        let authorization = sign_request(&params, &credentials).unwrap();
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKID/20231215/eu-central-1/storage/aws4_request, SignedHeaders=host, Signature="
        ));
    }
}
