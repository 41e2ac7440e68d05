//! Mock HTTP transport.

use crate::error::{LocalError, NetworkError, StorageError};
use crate::transport::{ByteStream, HttpRequest, HttpResponse, HttpTransport, RequestBody};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Canned HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// Response with the given status and an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// 200 with an empty body.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// 200 with a body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self::ok().with_body(body)
    }

    /// Error status with an XML `<Error>` document body.
    pub fn s3_error(status: u16, code: &str, message: &str) -> Self {
        Self::new(status)
            .with_header("content-type", "application/xml")
            .with_body(format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{}</Code><Message>{}</Message><RequestId>mock-request-id</RequestId></Error>",
                code, message
            ))
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Respond(MockResponse),
    ConnectionFailure(String),
    Interrupted { partial: Bytes, message: String },
}

/// Mock HTTP transport that replays queued responses and records requests.
#[derive(Default)]
pub struct MockTransport {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    requests: Mutex<Vec<HttpRequest>>,
    default_response: Option<MockResponse>,
}

impl MockTransport {
    /// Transport with nothing queued; any request fails with a network error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport with queued responses.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            outcomes: Mutex::new(responses.into_iter().map(MockOutcome::Respond).collect()),
            ..Self::default()
        }
    }

    /// Transport that answers every unqueued request with `response`.
    pub fn with_default(response: MockResponse) -> Self {
        Self {
            default_response: Some(response),
            ..Self::default()
        }
    }

    /// Queue a response.
    pub fn queue_response(&self, response: MockResponse) {
        self.outcomes.lock().push_back(MockOutcome::Respond(response));
    }

    /// Queue a connection failure.
    pub fn queue_connection_failure(&self, message: impl Into<String>) {
        self.outcomes
            .lock()
            .push_back(MockOutcome::ConnectionFailure(message.into()));
    }

    /// Queue a 200 whose body delivers `partial` and then fails.
    pub fn queue_interrupted_body(&self, partial: impl Into<Bytes>, message: impl Into<String>) {
        self.outcomes.lock().push_back(MockOutcome::Interrupted {
            partial: partial.into(),
            message: message.into(),
        });
    }

    /// All recorded requests.
    ///
    /// File bodies are recorded as the bytes read from the file.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests made with `method`.
    pub fn count_method(&self, method: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method.eq_ignore_ascii_case(method))
            .count()
    }

    /// The last request made.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

async fn materialize(body: RequestBody) -> Result<RequestBody, StorageError> {
    match body {
        RequestBody::File { path, .. } => match tokio::fs::read(&path).await {
            Ok(content) => Ok(RequestBody::Bytes(content.into())),
            Err(source) => Err(StorageError::Local(LocalError::Io { path, source })),
        },
        body => Ok(body),
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StorageError> {
        self.send_streaming(request).await?.buffer().await
    }

    async fn send_streaming(
        &self,
        mut request: HttpRequest,
    ) -> Result<HttpResponse<ByteStream>, StorageError> {
        request.body = materialize(request.body).await?;
        self.requests.lock().push(request);

        let outcome = self
            .outcomes
            .lock()
            .pop_front()
            .or_else(|| self.default_response.clone().map(MockOutcome::Respond));

        match outcome {
            Some(MockOutcome::Respond(mock)) => Ok(HttpResponse {
                status: mock.status,
                headers: mock.headers,
                body: mock.body.into(),
            }),
            Some(MockOutcome::Interrupted { partial, message }) => {
                let failure = StorageError::Network(NetworkError::ConnectionFailed { message });
                Ok(HttpResponse {
                    status: 200,
                    headers: HashMap::new(),
                    body: ByteStream::new(stream::iter(vec![Ok(partial), Err(failure)])),
                })
            }
            Some(MockOutcome::ConnectionFailure(message)) => {
                Err(StorageError::Network(NetworkError::ConnectionFailed { message }))
            }
            None => Err(StorageError::Network(NetworkError::ConnectionFailed {
                message: "No mock response available".to_string(),
            })),
        }
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued", &self.outcomes.lock().len())
            .field("recorded_requests", &self.request_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_replays_in_order() {
        let transport = MockTransport::with_responses(vec![
            MockResponse::ok_with_body("first"),
            MockResponse::new(404),
        ]);

        let first = transport
            .send(HttpRequest::new("GET", "https://example.com/1"))
            .await
            .unwrap();
        let second = transport
            .send(HttpRequest::new("HEAD", "https://example.com/2"))
            .await
            .unwrap();

        assert_eq!(first.body, Bytes::from("first"));
        assert_eq!(second.status, 404);
        assert_eq!(transport.count_method("head"), 1);
    }

    #[tokio::test]
    async fn test_mock_transport_default_response() {
        let transport = MockTransport::with_default(MockResponse::ok_with_body("default"));

        for _ in 0..2 {
            let response = transport
                .send(HttpRequest::new("GET", "https://example.com"))
                .await
                .unwrap();
            assert_eq!(response.body, Bytes::from("default"));
        }
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_transport_connection_failure() {
        let transport = MockTransport::new();
        transport.queue_connection_failure("connection reset");

        let result = transport
            .send(HttpRequest::new("GET", "https://example.com"))
            .await;
        assert!(matches!(
            result,
            Err(StorageError::Network(NetworkError::ConnectionFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_mock_transport_records_requests() {
        let transport = MockTransport::with_default(MockResponse::ok());

        transport
            .send(HttpRequest::new("PUT", "https://example.com").with_body(Bytes::from("body")))
            .await
            .unwrap();

        let recorded = transport.last_request().unwrap();
        assert_eq!(recorded.method, "PUT");
        assert_eq!(recorded.body.as_bytes(), Some(&b"body"[..]));
    }

    #[tokio::test]
    async fn test_mock_transport_records_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        std::fs::write(&path, b"from disk").unwrap();
        let transport = MockTransport::with_default(MockResponse::ok());

        transport
            .send(
                HttpRequest::new("PUT", "https://example.com")
                    .with_request_body(RequestBody::File { path, length: 9 }),
            )
            .await
            .unwrap();

        let recorded = transport.last_request().unwrap();
        assert_eq!(recorded.body.as_bytes(), Some(&b"from disk"[..]));
    }

    #[tokio::test]
    async fn test_mock_transport_interrupted_body() {
        let transport = MockTransport::new();
        transport.queue_interrupted_body("par", "reset mid-body");

        let response = transport
            .send_streaming(HttpRequest::new("GET", "https://example.com"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert!(matches!(
            response.body.into_bytes().await,
            Err(StorageError::Network(NetworkError::ConnectionFailed { .. }))
        ));
    }
}
