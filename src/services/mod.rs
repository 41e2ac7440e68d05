//! Service implementations over the signed HTTP transport.

mod multipart;
mod objects;

pub use multipart::MultipartService;
pub use objects::ObjectsService;

use crate::config::ClientConfig;
use crate::error::{map_http_status, map_s3_error_code, RequestError, StorageError};
use crate::transport::HttpResponse;
use crate::xml;
use url::Url;

/// Reject names that cannot be sent as written.
///
/// URL parsing folds `.` and `..` path segments, so a key holding one would
/// address a different key, or a different bucket.
pub(crate) fn validate_location(bucket: &str, key: &str) -> Result<(), StorageError> {
    if bucket.is_empty() {
        return Err(invalid_bucket(bucket, "bucket name must not be empty"));
    }
    if bucket.contains('/') || bucket == "." || bucket == ".." {
        return Err(invalid_bucket(bucket, "bucket name must be a single path segment"));
    }

    if key.is_empty() {
        return Err(StorageError::Request(RequestError::Validation {
            message: "object key must not be empty".to_string(),
        }));
    }
    if key.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(StorageError::Request(RequestError::Validation {
            message: format!(
                "object key '{}' contains a '.' or '..' segment and cannot be addressed",
                key
            ),
        }));
    }

    Ok(())
}

fn invalid_bucket(bucket: &str, reason: &str) -> StorageError {
    StorageError::Request(RequestError::InvalidBucketName {
        bucket: bucket.to_string(),
        reason: reason.to_string(),
    })
}

/// URL of an object, with an optional already-encoded query string.
pub(crate) fn object_url(
    config: &ClientConfig,
    service_name: &str,
    bucket: &str,
    key: &str,
    query: Option<&str>,
) -> Result<Url, StorageError> {
    validate_location(bucket, key)?;

    let endpoint = config.resolve_endpoint(service_name, Some(bucket))?;
    let path = config.build_path(bucket, Some(key));

    let mut url_str = format!("{}{}", endpoint.as_str().trim_end_matches('/'), path);
    if let Some(query) = query {
        url_str.push('?');
        url_str.push_str(query);
    }

    Url::parse(&url_str).map_err(|e| {
        StorageError::Request(RequestError::Validation {
            message: format!("Invalid URL: {}", e),
        })
    })
}

/// Turn a non-2xx response into an error, preferring the XML error document.
pub(crate) fn parse_error(response: &HttpResponse, bucket: &str, key: &str) -> StorageError {
    let request_id = response.request_id().map(String::from);

    if response.body.is_empty() {
        return map_http_status(response.status, bucket, Some(key), request_id);
    }

    let body_str = String::from_utf8_lossy(&response.body);
    match xml::parse_error_response(&body_str) {
        Ok(mut error_response) => {
            error_response.bucket.get_or_insert_with(|| bucket.to_string());
            error_response.key.get_or_insert_with(|| key.to_string());
            if error_response.request_id.is_none() {
                error_response.request_id = request_id;
            }
            let code = error_response.code.clone();
            map_s3_error_code(&code, response.status, Some(error_response))
        }
        Err(_) => map_http_status(response.status, bucket, Some(key), request_id),
    }
}
