//! Mock signer.

use crate::error::{SigningError, StorageError};
use crate::signing::{AwsSigner, Payload, SignedRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use url::Url;

/// Recorded sign call.
#[derive(Debug, Clone)]
pub struct SignCall {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: Url,
    /// Headers passed in for signing.
    pub headers: HashMap<String, String>,
    /// Whether a body was supplied.
    pub has_body: bool,
    /// `x-amz-content-sha256` the real signer would send.
    pub payload_hash: String,
}

/// Signer that stamps fixed `authorization` and `x-amz-date` headers.
///
/// Credentials are never consulted. Every call is recorded, including calls
/// made to fail with [`MockSigner::fail_next`].
pub struct MockSigner {
    stamp: HashMap<String, String>,
    fail_next: Mutex<Option<String>>,
    calls: Mutex<Vec<SignCall>>,
}

impl MockSigner {
    /// Signer that always succeeds.
    pub fn new() -> Self {
        Self {
            stamp: HashMap::from([
                (
                    "authorization".to_string(),
                    "AWS4-HMAC-SHA256 Credential=mock/20240115/us-east-1/s3/aws4_request".to_string(),
                ),
                ("x-amz-date".to_string(), "20240115T100000Z".to_string()),
            ]),
            fail_next: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next call with a signing error carrying `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    /// Calls made so far.
    pub fn sign_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The last recorded sign call.
    pub fn last_call(&self) -> Option<SignCall> {
        self.calls.lock().last().cloned()
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AwsSigner for MockSigner {
    async fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &HashMap<String, String>,
        payload: Payload<'_>,
    ) -> Result<SignedRequest, StorageError> {
        self.calls.lock().push(SignCall {
            method: method.to_string(),
            url: url.clone(),
            headers: headers.clone(),
            has_body: !payload.is_empty(),
            payload_hash: payload.hash(),
        });

        if let Some(message) = self.fail_next.lock().take() {
            return Err(StorageError::Signing(SigningError::CalculationFailed {
                message,
            }));
        }

        let headers = headers
            .iter()
            .chain(self.stamp.iter())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(SignedRequest {
            method: method.to_string(),
            url: url.clone(),
            headers,
        })
    }
}

impl std::fmt::Debug for MockSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSigner")
            .field("sign_count", &self.sign_count())
            .finish_non_exhaustive()
    }
}
