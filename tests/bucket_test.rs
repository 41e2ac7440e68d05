//! Integration tests for BucketClient over a mocked HTTP transport.

use s3_bucket::error::{
    AccessError, BucketError, LocalError, NetworkError, RequestError, ServerError,
};
use s3_bucket::mocks::{MockResponse, MockTransport};
use s3_bucket::{BucketClient, ClientConfig, ServiceClient, StorageError};
use std::sync::Arc;
use tempfile::tempdir;

fn create_test_client(transport: Arc<MockTransport>) -> ServiceClient {
    ServiceClient::builder("s3")
        .credentials("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
        .endpoint_url("http://localhost:9000")
        .transport(transport)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_upload_sends_signed_put() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok().with_header("etag", "\"abc123\""),
    ]));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    let dir = tempdir().unwrap();
    let path = dir.path().join("build.log");
    std::fs::write(&path, "line one\nline two\n").unwrap();

    bucket.upload(&path, "logs/build 1.log").await.unwrap();

    let recorded = transport.last_request().unwrap();
    assert_eq!(recorded.method, "PUT");
    assert_eq!(recorded.url, "http://localhost:9000/artifacts/logs/build%201.log");
    assert_eq!(recorded.body.as_bytes(), Some(&b"line one\nline two\n"[..]));
    assert_eq!(recorded.headers["x-amz-content-sha256"], "UNSIGNED-PAYLOAD");
    assert_eq!(recorded.headers["content-length"], "18");
    assert!(recorded.headers["authorization"].starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
}

#[tokio::test]
async fn test_upload_keeps_service_error_kind() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::s3_error(
        404,
        "NoSuchBucket",
        "The specified bucket does not exist",
    )]));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "missing");

    let dir = tempdir().unwrap();
    let path = dir.path().join("file");
    std::fs::write(&path, "x").unwrap();

    let err = bucket.upload(&path, "key").await.unwrap_err();
    match err {
        StorageError::Bucket(BucketError::NotFound { bucket, request_id }) => {
            assert_eq!(bucket, "missing");
            assert_eq!(request_id.as_deref(), Some("mock-request-id"));
        }
        other => panic!("Expected BucketError::NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_missing_file_makes_no_request() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok()));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");
    let dir = tempdir().unwrap();

    let err = bucket
        .upload(dir.path().join("nope"), "key")
        .await
        .unwrap_err();

    assert!(err.is_local());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_download_existing_destination_without_exist_ok() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok_with_body("remote")));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    let dir = tempdir().unwrap();
    let path = dir.path().join("local.txt");
    std::fs::write(&path, "local").unwrap();

    let err = bucket.download("key", &path, false).await.unwrap_err();

    assert!(matches!(
        err,
        StorageError::Local(LocalError::DestinationExists { .. })
    ));
    assert_eq!(transport.request_count(), 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "local");
}

#[tokio::test]
async fn test_download_existing_destination_with_exist_ok() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok_with_body("remote")));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    let dir = tempdir().unwrap();
    let path = dir.path().join("local.txt");
    std::fs::write(&path, "local").unwrap();

    bucket.download("key", &path, true).await.unwrap();

    assert_eq!(transport.count_method("GET"), 1);
    assert_eq!(transport.request_count(), 1);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "remote");
}

#[tokio::test]
async fn test_download_new_destination() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body(vec![0u8, 1, 2, 255]).with_header("content-type", "application/octet-stream"),
    ]));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    let dir = tempdir().unwrap();
    let path = dir.path().join("blob.bin");

    bucket.download("data/blob.bin", &path, false).await.unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), vec![0u8, 1, 2, 255]);
    assert_eq!(
        transport.last_request().unwrap().url,
        "http://localhost:9000/artifacts/data/blob.bin"
    );
}

#[tokio::test]
async fn test_download_failure_keeps_kind_and_writes_nothing() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::s3_error(
        403,
        "AccessDenied",
        "Access Denied",
    )]));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    let dir = tempdir().unwrap();
    let path = dir.path().join("never.txt");

    let err = bucket.download("secret", &path, false).await.unwrap_err();

    assert!(matches!(err, StorageError::Access(AccessError::AccessDenied { .. })));
    assert_eq!(err.error_code(), Some("AccessDenied"));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_download_connection_failure() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_connection_failure("connection refused");
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    let dir = tempdir().unwrap();
    let err = bucket
        .download("key", dir.path().join("out"), false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::Network(NetworkError::ConnectionFailed { .. })
    ));
}

#[tokio::test]
async fn test_key_exists_true_on_success() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok().with_header("content-length", "42"),
    ]));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    assert!(bucket.key_exists("present").await.unwrap());
    assert_eq!(transport.count_method("HEAD"), 1);
}

#[tokio::test]
async fn test_key_exists_false_on_404() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::new(404)]));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    assert!(!bucket.key_exists("absent").await.unwrap());
}

#[tokio::test]
async fn test_key_exists_false_on_no_such_key() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::s3_error(
        404,
        "NoSuchKey",
        "The specified key does not exist.",
    )]));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    assert!(!bucket.key_exists("absent").await.unwrap());
}

#[tokio::test]
async fn test_key_exists_raises_on_forbidden() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::new(403)
        .with_header("x-amz-request-id", "REQ123")]));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    let err = bucket.key_exists("key").await.unwrap_err();

    assert!(matches!(err, StorageError::Access(AccessError::AccessDenied { .. })));
    assert_eq!(err.request_id(), Some("REQ123"));
}

#[tokio::test]
async fn test_key_exists_raises_on_server_error() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::new(503)]));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    let err = bucket.key_exists("key").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Server(ServerError::ServiceUnavailable { .. })
    ));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_bucket_clients_share_one_service_client() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok()));
    let client = create_test_client(transport.clone());
    let first = BucketClient::new(&client, "first");
    let second = BucketClient::new(&client, "second");

    assert!(first.key_exists("a").await.unwrap());
    assert!(second.key_exists("b").await.unwrap());

    let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            "http://localhost:9000/first/a".to_string(),
            "http://localhost:9000/second/b".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_interrupted_download_keeps_previous_file() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_interrupted_body("rem", "connection reset by peer");
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "artifacts");

    let dir = tempdir().unwrap();
    let path = dir.path().join("local.txt");
    std::fs::write(&path, "local").unwrap();

    let err = bucket.download("key", &path, true).await.unwrap_err();

    assert!(matches!(
        err,
        StorageError::Network(NetworkError::ConnectionFailed { .. })
    ));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "local");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_dot_segment_keys_make_no_request() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok()));
    let client = create_test_client(transport.clone());
    let bucket = BucketClient::new(&client, "bucket");

    let dir = tempdir().unwrap();
    let path = dir.path().join("secret.txt");
    std::fs::write(&path, "x").unwrap();

    for key in ["reports/../secret.txt", "a/./b", "../other-bucket/k"] {
        let upload = bucket.upload(&path, key).await;
        let download = bucket.download(key, dir.path().join("out"), false).await;
        let exists = bucket.key_exists(key).await;

        for result in [upload.err(), download.err(), exists.err()] {
            assert!(
                matches!(result, Some(StorageError::Request(RequestError::Validation { .. }))),
                "{} was not rejected",
                key
            );
        }
    }
    assert_eq!(transport.request_count(), 0);
    assert!(!dir.path().join("out").exists());
}

#[tokio::test]
async fn test_large_upload_goes_through_multipart() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body(
            "<InitiateMultipartUploadResult><UploadId>U-1</UploadId></InitiateMultipartUploadResult>",
        ),
        MockResponse::ok().with_header("etag", "\"p1\""),
        MockResponse::ok().with_header("etag", "\"p2\""),
        MockResponse::ok_with_body(
            "<CompleteMultipartUploadResult><ETag>\"all-2\"</ETag></CompleteMultipartUploadResult>",
        ),
    ]));
    let part_size = 5 * 1024 * 1024;
    let config = ClientConfig::builder()
        .endpoint("http://localhost:9000")
        .unwrap()
        .multipart_threshold(part_size)
        .multipart_part_size(part_size)
        .build()
        .unwrap();
    let client = ServiceClient::builder("s3")
        .credentials("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
        .config(config)
        .transport(transport.clone())
        .build()
        .unwrap();
    let bucket = BucketClient::new(&client, "artifacts");

    let dir = tempdir().unwrap();
    let path = dir.path().join("big.bin");
    std::fs::write(&path, vec![b'z'; part_size as usize + 3]).unwrap();

    bucket.upload(&path, "big.bin").await.unwrap();

    let requests = transport.requests();
    let methods: Vec<&str> = requests.iter().map(|r| r.method.as_str()).collect();
    assert_eq!(methods, vec!["POST", "PUT", "PUT", "POST"]);
    assert_eq!(requests[1].body.as_bytes().map(<[u8]>::len), Some(part_size as usize));
    assert_eq!(requests[2].body.as_bytes().map(<[u8]>::len), Some(3));
    assert!(requests[3].url.ends_with("/artifacts/big.bin?uploadId=U-1"));
}
