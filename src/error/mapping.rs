//! Error code mapping from S3 responses to typed errors.

use super::*;

/// Parsed S3 error response.
#[derive(Debug, Clone, Default)]
pub struct S3ErrorResponse {
    /// S3 error code (e.g., "NoSuchKey").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Affected bucket, if any.
    pub bucket: Option<String>,
    /// Affected key, if any.
    pub key: Option<String>,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Extended request ID.
    pub host_id: Option<String>,
}

fn non_empty(message: String) -> Option<String> {
    if message.is_empty() {
        None
    } else {
        Some(message)
    }
}

/// Map an S3 error code to a typed error.
///
/// `status` is only consulted for codes the mapping does not recognise, so
/// that the original HTTP status survives in [`ServerError::UnexpectedStatus`].
pub fn map_s3_error_code(code: &str, status: u16, response: Option<S3ErrorResponse>) -> StorageError {
    let resp = response.unwrap_or_else(|| S3ErrorResponse {
        code: code.to_string(),
        ..Default::default()
    });

    match code {
        "NoSuchBucket" => StorageError::Bucket(BucketError::NotFound {
            bucket: resp.bucket.unwrap_or_default(),
            request_id: resp.request_id,
        }),

        "NoSuchKey" => StorageError::Object(ObjectError::NotFound {
            bucket: resp.bucket.unwrap_or_default(),
            key: resp.key.unwrap_or_default(),
            request_id: resp.request_id,
        }),
        "PreconditionFailed" => StorageError::Object(ObjectError::PreconditionFailed {
            bucket: resp.bucket.unwrap_or_default(),
            key: resp.key.unwrap_or_default(),
            condition: resp.message,
            request_id: resp.request_id,
        }),
        "NotModified" => StorageError::Object(ObjectError::NotModified {
            bucket: resp.bucket.unwrap_or_default(),
            key: resp.key.unwrap_or_default(),
            request_id: resp.request_id,
        }),
        "InvalidObjectState" => StorageError::Object(ObjectError::InvalidState {
            bucket: resp.bucket.unwrap_or_default(),
            key: resp.key.unwrap_or_default(),
            message: resp.message,
            request_id: resp.request_id,
        }),

        "AccessDenied" | "AllAccessDisabled" => StorageError::Access(AccessError::AccessDenied {
            message: non_empty(resp.message),
            request_id: resp.request_id,
        }),
        "InvalidAccessKeyId" => StorageError::Access(AccessError::InvalidAccessKeyId {
            request_id: resp.request_id,
        }),
        "SignatureDoesNotMatch" => StorageError::Access(AccessError::SignatureDoesNotMatch {
            request_id: resp.request_id,
        }),
        "ExpiredToken" | "TokenRefreshRequired" => {
            StorageError::Access(AccessError::ExpiredToken {
                request_id: resp.request_id,
            })
        }

        "InternalError" => StorageError::Server(ServerError::InternalError {
            message: non_empty(resp.message),
            request_id: resp.request_id,
        }),
        "ServiceUnavailable" => StorageError::Server(ServerError::ServiceUnavailable {
            request_id: resp.request_id,
        }),
        "SlowDown" => StorageError::Server(ServerError::SlowDown {
            request_id: resp.request_id,
        }),

        "InvalidBucketName" => StorageError::Request(RequestError::InvalidBucketName {
            bucket: resp.bucket.unwrap_or_default(),
            reason: resp.message,
        }),
        "InvalidRequest" | "InvalidArgument" | "MalformedXML" | "BadDigest" => {
            StorageError::Request(RequestError::Validation {
                message: resp.message,
            })
        }
        "EntityTooLarge" => StorageError::Request(RequestError::EntityTooLarge {
            message: resp.message,
        }),

        _ => StorageError::Server(ServerError::UnexpectedStatus {
            status,
            code: code.to_string(),
            message: resp.message,
            request_id: resp.request_id,
        }),
    }
}

/// Map an HTTP status code to an error when no S3 error code is available.
///
/// HEAD responses never carry a body, so this is the only classification
/// they get.
pub fn map_http_status(
    status: u16,
    bucket: &str,
    key: Option<&str>,
    request_id: Option<String>,
) -> StorageError {
    match status {
        301 | 307 => StorageError::Configuration(ConfigurationError::WrongRegion {
            correct_region: "unknown".to_string(),
            configured_region: "unknown".to_string(),
        }),
        400 => StorageError::Request(RequestError::Validation {
            message: "Bad request".to_string(),
        }),
        403 => StorageError::Access(AccessError::AccessDenied {
            message: None,
            request_id,
        }),
        404 => match key {
            Some(key) => StorageError::Object(ObjectError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
                request_id,
            }),
            None => StorageError::Bucket(BucketError::NotFound {
                bucket: bucket.to_string(),
                request_id,
            }),
        },
        412 => StorageError::Object(ObjectError::PreconditionFailed {
            bucket: bucket.to_string(),
            key: key.unwrap_or_default().to_string(),
            condition: "Precondition failed".to_string(),
            request_id,
        }),
        500 => StorageError::Server(ServerError::InternalError {
            message: None,
            request_id,
        }),
        502 => StorageError::Server(ServerError::BadGateway { request_id }),
        503 => StorageError::Server(ServerError::ServiceUnavailable { request_id }),
        _ => StorageError::Server(ServerError::UnexpectedStatus {
            status,
            code: status.to_string(),
            message: format!("HTTP status {}", status),
            request_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_map_no_such_bucket() {
        let error = map_s3_error_code(
            "NoSuchBucket",
            404,
            Some(S3ErrorResponse {
                code: "NoSuchBucket".into(),
                message: "The specified bucket does not exist".into(),
                bucket: Some("my-bucket".into()),
                request_id: Some("ABC123".into()),
                ..Default::default()
            }),
        );

        match error {
            StorageError::Bucket(BucketError::NotFound { bucket, request_id }) => {
                assert_eq!(bucket, "my-bucket");
                assert_eq!(request_id, Some("ABC123".to_string()));
            }
            other => panic!("Expected BucketError::NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_map_no_such_key() {
        let error = map_s3_error_code(
            "NoSuchKey",
            404,
            Some(S3ErrorResponse {
                code: "NoSuchKey".into(),
                message: "The specified key does not exist".into(),
                bucket: Some("my-bucket".into()),
                key: Some("my-key".into()),
                request_id: Some("DEF456".into()),
                host_id: None,
            }),
        );

        match error {
            StorageError::Object(ObjectError::NotFound {
                bucket,
                key,
                request_id,
            }) => {
                assert_eq!(bucket, "my-bucket");
                assert_eq!(key, "my-key");
                assert_eq!(request_id, Some("DEF456".to_string()));
            }
            other => panic!("Expected ObjectError::NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_map_access_denied_keeps_message() {
        let error = map_s3_error_code(
            "AccessDenied",
            403,
            Some(S3ErrorResponse {
                code: "AccessDenied".into(),
                message: "Access Denied".into(),
                ..Default::default()
            }),
        );

        match error {
            StorageError::Access(AccessError::AccessDenied { message, .. }) => {
                assert_eq!(message.as_deref(), Some("Access Denied"));
            }
            other => panic!("Expected AccessError::AccessDenied, got {:?}", other),
        }
    }

    #[test]
    fn test_map_unknown_code_keeps_status() {
        let error = map_s3_error_code("QuotaExceeded", 429, None);

        match error {
            StorageError::Server(ServerError::UnexpectedStatus { status, code, .. }) => {
                assert_eq!(status, 429);
                assert_eq!(code, "QuotaExceeded");
            }
            other => panic!("Expected ServerError::UnexpectedStatus, got {:?}", other),
        }
    }

    #[test_case(403, Some(403) ; "forbidden")]
    #[test_case(404, Some(404) ; "not found")]
    #[test_case(500, Some(500) ; "internal")]
    #[test_case(502, Some(502) ; "bad gateway")]
    #[test_case(503, Some(503) ; "unavailable")]
    #[test_case(429, Some(429) ; "unmapped status")]
    fn test_map_http_status_preserves_status(status: u16, expected: Option<u16>) {
        let error = map_http_status(status, "bucket", Some("key"), None);
        assert_eq!(error.status_code(), expected);
    }

    #[test]
    fn test_map_http_status_404_without_key_is_bucket() {
        assert!(matches!(
            map_http_status(404, "bucket", None, None),
            StorageError::Bucket(BucketError::NotFound { .. })
        ));
        assert!(map_http_status(404, "bucket", Some("k"), None).is_not_found());
    }
}
