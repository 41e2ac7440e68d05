//! HTTP transport layer.
//!
//! [`HttpTransport`] is the seam between request building and the network.
//! [`ReqwestTransport`] is the production implementation; tests substitute
//! [`MockTransport`](crate::mocks::MockTransport).
//!
//! Request bodies are either buffered or streamed from a file, and response
//! bodies can be consumed chunk by chunk through [`ByteStream`]. The read
//! timeout bounds how long the transport waits without progress, never the
//! length of a whole transfer.

use crate::config::ClientConfig;
use crate::error::{LocalError, NetworkError, StorageError};
use crate::signing::Payload;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::io::ReaderStream;

const USER_AGENT: &str = concat!("s3-bucket-client/", env!("CARGO_PKG_VERSION"));

/// Buffered bodies larger than this are sent in slices of this size, so each
/// slice counts as progress.
const UPLOAD_CHUNK: usize = 64 * 1024;

/// What goes on the wire after the headers.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A buffered payload.
    Bytes(Bytes),
    /// The contents of a local file, streamed as they are read.
    File {
        /// File to stream.
        path: PathBuf,
        /// Size sent as `content-length`.
        length: u64,
    },
}

impl RequestBody {
    /// What the signature commits to: buffered bytes are hashed, files are not.
    pub fn payload(&self) -> Payload<'_> {
        match self {
            RequestBody::Empty => Payload::EMPTY,
            RequestBody::Bytes(bytes) => Payload::Bytes(&bytes[..]),
            RequestBody::File { .. } => Payload::Unsigned,
        }
    }

    /// The buffered bytes, if this body is buffered.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RequestBody::Bytes(bytes) => Some(&bytes[..]),
            _ => None,
        }
    }

    /// Number of bytes that will be sent.
    pub fn len(&self) -> u64 {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Bytes(bytes) => bytes.len() as u64,
            RequestBody::File { length, .. } => *length,
        }
    }

    /// Whether nothing will be sent.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A signed request, ready for the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Method, upper case.
    pub method: String,
    /// Absolute URL.
    pub url: String,
    /// Header names are lower case once signed.
    pub headers: HashMap<String, String>,
    /// Payload.
    pub body: RequestBody,
}

impl HttpRequest {
    /// Request with no headers and no body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Attach a buffered payload.
    pub fn with_body(self, body: impl Into<Bytes>) -> Self {
        self.with_request_body(RequestBody::Bytes(body.into()))
    }

    /// Attach any kind of payload.
    pub fn with_request_body(self, body: RequestBody) -> Self {
        Self { body, ..self }
    }

    /// Set one header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Merge in a header map, replacing existing names.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// A response body read incrementally.
///
/// Each item is the next chunk or the error that ended the body.
pub struct ByteStream(Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>);

impl ByteStream {
    /// Wrap a chunk stream.
    pub fn new<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Bytes, StorageError>> + Send + 'static,
    {
        Self(Box::pin(chunks))
    }

    /// Read the remaining chunks into one buffer.
    pub async fn into_bytes(mut self) -> Result<Bytes, StorageError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

impl Stream for ByteStream {
    type Item = Result<Bytes, StorageError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0.as_mut().poll_next(cx)
    }
}

impl From<Bytes> for ByteStream {
    fn from(bytes: Bytes) -> Self {
        Self::new(stream::iter((!bytes.is_empty()).then_some(Ok(bytes))))
    }
}

impl From<&'static str> for ByteStream {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<Vec<u8>> for ByteStream {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl Default for ByteStream {
    fn default() -> Self {
        Bytes::new().into()
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream").finish_non_exhaustive()
    }
}

/// Status, headers and body of a response.
///
/// The body is buffered by default; [`HttpTransport::send_streaming`] returns
/// a [`ByteStream`] body instead.
#[derive(Debug, Clone)]
pub struct HttpResponse<B = Bytes> {
    /// Status code.
    pub status: u16,
    /// Header names as the server sent them.
    pub headers: HashMap<String, String>,
    /// Body; empty for HEAD.
    pub body: B,
}

impl<B> HttpResponse<B> {
    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find_map(|(key, value)| key.eq_ignore_ascii_case(name).then_some(value.as_str()))
    }

    /// Owned copy of a header value.
    pub fn header_string(&self, name: &str) -> Option<String> {
        self.header(name).map(str::to_string)
    }

    /// The `x-amz-request-id` header.
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-amz-request-id")
    }

    /// The `content-length` header, if it parses.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.parse().ok()
    }
}

impl HttpResponse<ByteStream> {
    /// Read the whole body.
    pub async fn buffer(self) -> Result<HttpResponse, StorageError> {
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers,
            body: self.body.into_bytes().await?,
        })
    }
}

impl From<HttpResponse> for HttpResponse<ByteStream> {
    fn from(response: HttpResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body.into(),
        }
    }
}

/// Sends requests over the network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one exchange and buffer the response body.
    ///
    /// Non-2xx responses are returned as `Ok`; only failures to complete the
    /// exchange are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StorageError>;

    /// Perform one exchange and hand back the body unread.
    async fn send_streaming(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse<ByteStream>, StorageError> {
        Ok(self.send(request).await?.into())
    }
}

/// Time of the last observed progress on one exchange.
#[derive(Clone)]
struct Activity(Arc<Mutex<Instant>>);

impl Activity {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    fn touch(&self) {
        *self.0.lock() = Instant::now();
    }

    /// Resolves once nothing has happened for `limit`.
    async fn stalled(&self, limit: Duration) {
        loop {
            let deadline = *self.0.lock() + limit;
            if deadline <= Instant::now() {
                return;
            }
            tokio::time::sleep_until(deadline).await;
        }
    }
}

/// [`HttpTransport`] backed by a pooled `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    read_timeout: Duration,
}

impl ReqwestTransport {
    /// Transport with the default [`ClientConfig`] settings.
    pub fn new() -> Result<Self, StorageError> {
        Self::from_config(&ClientConfig::default())
    }

    /// Transport using the timeouts, pool and TLS settings of `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_connections as usize)
            .pool_idle_timeout(config.idle_timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NetworkError::TlsError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            read_timeout: config.read_timeout,
        })
    }

    /// Send the request and wait for the response head.
    ///
    /// A streamed body counts as progress for every chunk read from disk, so
    /// only a stalled upload or a silent server hits the timeout.
    async fn dispatch(&self, request: HttpRequest) -> Result<reqwest::Response, StorageError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            NetworkError::ConnectionFailed {
                message: format!("unsupported HTTP method '{}'", request.method),
            }
        })?;

        // reqwest derives Host from the URL, matching the signed value.
        let builder = request
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("host"))
            .fold(self.client.request(method, &request.url), |builder, (name, value)| {
                builder.header(name.as_str(), value.as_str())
            });

        let activity = Activity::new();
        // Streamed bodies have no length of their own; S3 rejects chunked PUTs.
        let has_length = request
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-length"));
        let builder = match (&request.body, has_length) {
            (RequestBody::Bytes(bytes), false) if bytes.len() > UPLOAD_CHUNK => {
                builder.header(reqwest::header::CONTENT_LENGTH, bytes.len())
            }
            (RequestBody::File { length, .. }, false) => {
                builder.header(reqwest::header::CONTENT_LENGTH, *length)
            }
            _ => builder,
        };

        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) if bytes.len() <= UPLOAD_CHUNK => builder.body(bytes),
            RequestBody::Bytes(bytes) => {
                let progress = activity.clone();
                let chunks: Vec<Result<Bytes, std::io::Error>> = (0..bytes.len())
                    .step_by(UPLOAD_CHUNK)
                    .map(|start| Ok(bytes.slice(start..(start + UPLOAD_CHUNK).min(bytes.len()))))
                    .collect();
                let chunks = stream::iter(chunks).inspect(move |_| progress.touch());
                builder.body(reqwest::Body::wrap_stream(chunks))
            }
            RequestBody::File { path, .. } => {
                let file = tokio::fs::File::open(&path).await.map_err(|source| {
                    StorageError::Local(LocalError::Io {
                        path: path.clone(),
                        source,
                    })
                })?;
                let progress = activity.clone();
                let chunks = ReaderStream::new(file).inspect(move |_| progress.touch());
                builder.body(reqwest::Body::wrap_stream(chunks))
            }
        };

        tokio::select! {
            result = builder.send() => {
                result.map_err(|e| network_error(e, "request failed", self.read_timeout))
            }
            _ = activity.stalled(self.read_timeout) => Err(StorageError::Network(
                NetworkError::Timeout { duration: self.read_timeout },
            )),
        }
    }
}

fn network_error(e: reqwest::Error, context: &str, read_timeout: Duration) -> StorageError {
    let error = if e.is_timeout() {
        NetworkError::Timeout {
            duration: read_timeout,
        }
    } else {
        NetworkError::ConnectionFailed {
            message: format!("{}: {}", context, e),
        }
    };
    StorageError::Network(error)
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StorageError> {
        self.send_streaming(request).await?.buffer().await
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse<ByteStream>, StorageError> {
        let response = self.dispatch(request).await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let read_timeout = self.read_timeout;
        let chunks = Box::pin(response.bytes_stream());
        let body = stream::unfold(chunks, move |mut chunks| async move {
            let item = match tokio::time::timeout(read_timeout, chunks.next()).await {
                Ok(None) => return None,
                Ok(Some(Ok(chunk))) => Ok(chunk),
                Ok(Some(Err(e))) => Err(network_error(e, "failed to read response body", read_timeout)),
                Err(_) => Err(StorageError::Network(NetworkError::Timeout {
                    duration: read_timeout,
                })),
            };
            Some((item, chunks))
        });

        Ok(HttpResponse {
            status,
            headers,
            body: ByteStream::new(body),
        })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}
