//! Objects service: PUT, GET and HEAD.

use super::{object_url, parse_error};
use crate::config::ClientConfig;
use crate::error::StorageError;
use crate::signing::{AwsSigner, Payload};
use crate::transport::{HttpRequest, HttpTransport, RequestBody};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Service for object operations.
pub struct ObjectsService {
    config: Arc<ClientConfig>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn AwsSigner>,
    service_name: String,
}

impl ObjectsService {
    /// Create a new objects service.
    pub fn new(
        config: Arc<ClientConfig>,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn AwsSigner>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            config,
            transport,
            signer,
            service_name: service_name.into(),
        }
    }

    /// Put an object into a bucket in one request, replacing any existing
    /// object.
    pub async fn put(&self, request: PutObjectRequest) -> Result<PutObjectOutput, StorageError> {
        let url = object_url(
            &self.config,
            &self.service_name,
            &request.bucket,
            &request.key,
            None,
        )?;

        let mut headers = HashMap::new();
        if let RequestBody::File { length, .. } = &request.body {
            headers.insert("content-length".to_string(), length.to_string());
        }

        let signed = self
            .signer
            .sign("PUT", &url, &headers, request.body.payload())
            .await?;

        let http_request = HttpRequest::new("PUT", signed.url.as_str())
            .with_headers(signed.headers)
            .with_request_body(request.body);

        let response = self.transport.send(http_request).await?;
        trace!(status = response.status, "PUT {}", url);

        if !response.is_success() {
            return Err(parse_error(&response, &request.bucket, &request.key));
        }

        Ok(PutObjectOutput {
            e_tag: response.header_string("etag"),
            version_id: response.header_string("x-amz-version-id"),
            request_id: response.request_id().map(String::from),
        })
    }

    /// Get an object. The content is streamed through the returned body.
    pub async fn get(&self, request: GetObjectRequest) -> Result<GetObjectOutput, StorageError> {
        let url = object_url(
            &self.config,
            &self.service_name,
            &request.bucket,
            &request.key,
            None,
        )?;

        let signed = self
            .signer
            .sign("GET", &url, &HashMap::new(), Payload::EMPTY)
            .await?;

        let http_request =
            HttpRequest::new("GET", signed.url.as_str()).with_headers(signed.headers);

        let response = self.transport.send_streaming(http_request).await?;
        trace!(status = response.status, "GET {}", url);

        if !response.is_success() {
            let response = response.buffer().await?;
            return Err(parse_error(&response, &request.bucket, &request.key));
        }

        Ok(GetObjectOutput {
            e_tag: response.header_string("etag"),
            content_length: response.content_length(),
            content_type: response.header_string("content-type"),
            last_modified: response.header_string("last-modified"),
            request_id: response.request_id().map(String::from),
            body: response.body,
        })
    }

    /// Get object metadata without its content.
    pub async fn head(&self, request: HeadObjectRequest) -> Result<HeadObjectOutput, StorageError> {
        let url = object_url(
            &self.config,
            &self.service_name,
            &request.bucket,
            &request.key,
            None,
        )?;

        let signed = self
            .signer
            .sign("HEAD", &url, &HashMap::new(), Payload::EMPTY)
            .await?;

        let http_request =
            HttpRequest::new("HEAD", signed.url.as_str()).with_headers(signed.headers);

        let response = self.transport.send(http_request).await?;
        trace!(status = response.status, "HEAD {}", url);

        if !response.is_success() {
            return Err(parse_error(&response, &request.bucket, &request.key));
        }

        Ok(HeadObjectOutput {
            e_tag: response.header_string("etag"),
            content_length: response.content_length(),
            content_type: response.header_string("content-type"),
            last_modified: response.header_string("last-modified"),
            request_id: response.request_id().map(String::from),
        })
    }
}

impl std::fmt::Debug for ObjectsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectsService")
            .field("config", &self.config)
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}
