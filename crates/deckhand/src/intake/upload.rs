//! Streaming multipart upload source.
//!
//! Consumes a multipart request body field by field without buffering
//! the whole body, so memory stays bounded for large documents. The
//! optional `investor_id` field must precede the `file` field: once the
//! file field is reached its byte stream is handed off untouched and no
//! later field is consulted.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use multer::Multipart;
use uuid::Uuid;

use super::candidate::{ByteSource, CandidateDocument, DocumentSource, SourceTag};
use super::error::IntakeError;

/// Multipart field carrying the optional owning investor id.
const INVESTOR_FIELD: &str = "investor_id";

/// Multipart field carrying the document bytes.
const FILE_FIELD: &str = "file";

/// Fallback when the file field names no filename.
const DEFAULT_FILENAME: &str = "document";

pub struct UploadSource {
    multipart: Multipart<'static>,
}

impl UploadSource {
    /// Builds an upload source from a request content type and body
    /// stream. Fails when the content type carries no multipart boundary.
    pub fn new<S, B, E>(content_type: &str, body: S) -> Result<Self, IntakeError>
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let boundary = multer::parse_boundary(content_type)
            .map_err(|e| IntakeError::MalformedUpload(format!("bad content type: {}", e)))?;
        Ok(Self {
            multipart: Multipart::new(body, boundary),
        })
    }

    async fn into_candidate(mut self) -> Result<CandidateDocument, IntakeError> {
        let mut investor_id: Option<Uuid> = None;

        while let Some(field) = self
            .multipart
            .next_field()
            .await
            .map_err(|e| IntakeError::MalformedUpload(e.to_string()))?
        {
            match field.name() {
                Some(INVESTOR_FIELD) => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| IntakeError::MalformedUpload(e.to_string()))?;
                    let trimmed = text.trim();
                    let parsed = Uuid::parse_str(trimmed)
                        .map_err(|_| IntakeError::InvalidInvestorId(trimmed.to_string()))?;
                    investor_id = Some(parsed);
                }
                Some(FILE_FIELD) => {
                    let filename = field
                        .file_name()
                        .filter(|n| !n.is_empty())
                        .unwrap_or(DEFAULT_FILENAME)
                        .to_string();
                    let stream = field.map_err(std::io::Error::other).boxed();
                    return Ok(CandidateDocument {
                        filename,
                        investor_id,
                        source: SourceTag::Upload,
                        source_metadata: None,
                        bytes: ByteSource::Stream(stream),
                    });
                }
                _ => {
                    // Unknown field; dropping it lets multer skip its bytes.
                }
            }
        }

        Err(IntakeError::MalformedUpload(
            "missing file field".to_string(),
        ))
    }
}

#[async_trait]
impl DocumentSource for UploadSource {
    async fn extract(self) -> Result<Vec<CandidateDocument>, IntakeError> {
        Ok(vec![self.into_candidate().await?])
    }
}
