//! XML for S3 error documents and multipart uploads.

use crate::error::{ResponseError, S3ErrorResponse, StorageError};
use crate::types::CompletedPart;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Parse an S3 `<Error>` document.
pub fn parse_error_response(xml: &str) -> Result<S3ErrorResponse, StorageError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut response = S3ErrorResponse::default();
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Code" => response.code = text,
                    "Message" => response.message = text,
                    "BucketName" | "Bucket" => response.bucket = Some(text),
                    "Key" => response.key = Some(text),
                    "RequestId" => response.request_id = Some(text),
                    "HostId" => response.host_id = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(StorageError::Response(ResponseError::XmlParseError {
                    message: e.to_string(),
                }));
            }
            _ => {}
        }
    }

    if response.code.is_empty() {
        return Err(StorageError::Response(ResponseError::InvalidResponse {
            message: "Error document has no <Code> element".to_string(),
        }));
    }

    Ok(response)
}

/// Text of the first `element` in `xml`.
fn element_text(xml: &str, element: &str) -> Result<Option<String>, StorageError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut inside = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => inside = e.name().as_ref() == element.as_bytes(),
            Ok(Event::Text(e)) if inside => {
                return Ok(Some(e.unescape().unwrap_or_default().to_string()));
            }
            Ok(Event::End(_)) => inside = false,
            Ok(Event::Eof) => return Ok(None),
            Err(e) => {
                return Err(StorageError::Response(ResponseError::XmlParseError {
                    message: e.to_string(),
                }));
            }
            _ => {}
        }
    }
}

/// Upload id from an `<InitiateMultipartUploadResult>` document.
pub fn parse_initiate_multipart_upload(xml: &str) -> Result<String, StorageError> {
    element_text(xml, "UploadId")?
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            StorageError::Response(ResponseError::InvalidResponse {
                message: "InitiateMultipartUploadResult has no <UploadId>".to_string(),
            })
        })
}

/// ETag from a `<CompleteMultipartUploadResult>` document.
pub fn parse_complete_multipart_upload(xml: &str) -> Result<Option<String>, StorageError> {
    element_text(xml, "ETag")
}

/// `<CompleteMultipartUpload>` body listing `parts` in order.
pub fn build_complete_multipart_xml(parts: &[CompletedPart]) -> String {
    let mut xml = String::from("<CompleteMultipartUpload>");
    for part in parts {
        xml.push_str(&format!(
            "<Part><PartNumber>{}</PartNumber><ETag>{}</ETag></Part>",
            part.part_number,
            escape(part.e_tag.as_str())
        ));
    }
    xml.push_str("</CompleteMultipartUpload>");
    xml
}
