//! Multipart uploads: create, upload parts, complete, abort.

use super::{object_url, parse_error};
use crate::config::{ClientConfig, MAX_PART_SIZE};
use crate::error::{LocalError, RequestError, ResponseError, StorageError};
use crate::signing::{encode_query_value, AwsSigner, Payload};
use crate::transfer::read_chunk;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::types::{CompletedPart, PutObjectOutput, UploadPartRequest};
use crate::xml;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Most parts one upload may have.
pub const MAX_PARTS: u64 = 10_000;

/// Largest object a multipart upload can store.
pub const MAX_OBJECT_SIZE: u64 = 5 * 1024 * 1024 * 1024 * 1024;

/// Service for multipart uploads.
pub struct MultipartService {
    config: Arc<ClientConfig>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn AwsSigner>,
    service_name: String,
}

impl MultipartService {
    /// Create a new multipart service.
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

    async fn exchange(
        &self,
        method: &str,
        bucket: &str,
        key: &str,
        query: &str,
        body: Option<bytes::Bytes>,
    ) -> Result<HttpResponse, StorageError> {
        let url = object_url(&self.config, &self.service_name, bucket, key, Some(query))?;

        let payload = match &body {
            Some(bytes) => Payload::Bytes(&bytes[..]),
            None => Payload::EMPTY,
        };
        let signed = self
            .signer
            .sign(method, &url, &HashMap::new(), payload)
            .await?;

        let mut http_request =
            HttpRequest::new(method, signed.url.as_str()).with_headers(signed.headers);
        if let Some(body) = body {
            http_request = http_request.with_body(body);
        }

        let response = self.transport.send(http_request).await?;
        trace!(status = response.status, "{} {}", method, url);

        if !response.is_success() {
            return Err(parse_error(&response, bucket, key));
        }
        Ok(response)
    }

    /// Start an upload and return its id.
    pub async fn create(&self, bucket: &str, key: &str) -> Result<String, StorageError> {
        let response = self.exchange("POST", bucket, key, "uploads", None).await?;
        xml::parse_initiate_multipart_upload(&String::from_utf8_lossy(&response.body))
    }

    /// Store one part and return it as it must be listed on completion.
    pub async fn upload_part(&self, request: UploadPartRequest) -> Result<CompletedPart, StorageError> {
        let query = format!(
            "partNumber={}&uploadId={}",
            request.part_number,
            encode_query_value(&request.upload_id)
        );
        let response = self
            .exchange("PUT", &request.bucket, &request.key, &query, Some(request.body))
            .await?;

        let e_tag = response.header_string("etag").ok_or_else(|| {
            StorageError::Response(ResponseError::InvalidResponse {
                message: format!("part {} was stored without an ETag", request.part_number),
            })
        })?;

        Ok(CompletedPart {
            part_number: request.part_number,
            e_tag,
        })
    }

    /// Assemble the stored parts into the object.
    ///
    /// The service can report a failure inside a 200 response; that is
    /// returned as an error too.
    pub async fn complete(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<PutObjectOutput, StorageError> {
        let query = format!("uploadId={}", encode_query_value(upload_id));
        let body = xml::build_complete_multipart_xml(parts);
        let response = self
            .exchange("POST", bucket, key, &query, Some(body.into()))
            .await?;

        let text = String::from_utf8_lossy(&response.body);
        if text.contains("<Error>") {
            return Err(parse_error(
                &HttpResponse {
                    status: 500,
                    ..response.clone()
                },
                bucket,
                key,
            ));
        }

        Ok(PutObjectOutput {
            e_tag: xml::parse_complete_multipart_upload(&text)?
                .or_else(|| response.header_string("etag")),
            version_id: response.header_string("x-amz-version-id"),
            request_id: response.request_id().map(String::from),
        })
    }

    /// Discard an upload and the parts stored so far.
    pub async fn abort(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), StorageError> {
        let query = format!("uploadId={}", encode_query_value(upload_id));
        self.exchange("DELETE", bucket, key, &query, None).await?;
        Ok(())
    }

    /// Size of each part for an object of `length` bytes.
    ///
    /// The configured size grows when the object would otherwise need more
    /// than [`MAX_PARTS`] parts.
    pub fn part_size_for(&self, length: u64) -> u64 {
        self.config
            .multipart_part_size
            .max(length.div_ceil(MAX_PARTS))
            .min(MAX_PART_SIZE)
    }

    /// Upload a local file of `length` bytes in parts.
    ///
    /// Only one part is held in memory at a time. If any step fails the
    /// upload is aborted and the first error is returned.
    pub async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        length: u64,
    ) -> Result<PutObjectOutput, StorageError> {
        if length > MAX_OBJECT_SIZE {
            return Err(StorageError::Request(RequestError::EntityTooLarge {
                message: format!(
                    "{} is {} bytes; objects are limited to {} bytes",
                    path.display(),
                    length,
                    MAX_OBJECT_SIZE
                ),
            }));
        }

        let mut file = tokio::fs::File::open(path).await.map_err(|source| {
            StorageError::Local(LocalError::Io {
                path: path.to_path_buf(),
                source,
            })
        })?;

        let upload_id = self.create(bucket, key).await?;
        let part_size = self.part_size_for(length);
        debug!(bucket, key, upload_id = %upload_id, part_size, "multipart upload started");

        let uploaded = self
            .upload_parts(bucket, key, &upload_id, &mut file, path, length, part_size)
            .await;

        let result = match uploaded {
            Ok(parts) => self.complete(bucket, key, &upload_id, &parts).await,
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = self.abort(bucket, key, &upload_id).await {
                warn!(bucket, key, upload_id = %upload_id, error = %e, "failed to abort multipart upload");
            }
        }

        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        file: &mut tokio::fs::File,
        path: &Path,
        length: u64,
        part_size: u64,
    ) -> Result<Vec<CompletedPart>, StorageError> {
        let mut parts = Vec::new();
        let mut offset = 0u64;

        // An empty file still needs one (empty) part.
        while offset < length || parts.is_empty() {
            let len = part_size.min(length - offset);
            let body = read_chunk(file, path, len as usize).await?;
            let part_number = parts.len() as u32 + 1;

            let part = self
                .upload_part(UploadPartRequest {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    upload_id: upload_id.to_string(),
                    part_number,
                    body,
                })
                .await?;
            trace!(part_number, len, "part stored");

            parts.push(part);
            offset += len;
        }

        Ok(parts)
    }
}

impl std::fmt::Debug for MultipartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartService")
            .field("config", &self.config)
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}
