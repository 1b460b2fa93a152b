//! Normalized intake candidates.
//!
//! Both entry points reduce their raw shapes to `CandidateDocument`
//! before anything touches staging or the record store, so the rest of
//! intake is source-agnostic.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use uuid::Uuid;

use super::error::IntakeError;

/// Which entry point produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTag {
    Upload,
    Email,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Upload => "upload",
            SourceTag::Email => "email",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes for a candidate: either still streaming from the source
/// (uploads) or already decoded in memory (email attachments).
pub enum ByteSource {
    Stream(BoxStream<'static, std::io::Result<Bytes>>),
    Buffered(Vec<u8>),
}

impl ByteSource {
    /// Converts to a stream either way, so staging sees one input shape.
    pub fn into_stream(self) -> BoxStream<'static, std::io::Result<Bytes>> {
        match self {
            ByteSource::Stream(s) => s,
            ByteSource::Buffered(bytes) => {
                stream::once(async move { Ok(Bytes::from(bytes)) }).boxed()
            }
        }
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteSource::Stream(_) => f.write_str("ByteSource::Stream(..)"),
            ByteSource::Buffered(bytes) => {
                write!(f, "ByteSource::Buffered({} bytes)", bytes.len())
            }
        }
    }
}

/// One document normalized from either source, ready for staging.
#[derive(Debug)]
pub struct CandidateDocument {
    pub filename: String,
    pub investor_id: Option<Uuid>,
    pub source: SourceTag,
    pub source_metadata: Option<serde_json::Value>,
    pub bytes: ByteSource,
}

/// A producer of candidate documents.
///
/// Upload extraction yields exactly one candidate; a mailbox sweep
/// yields zero or more. Extraction consumes the source.
#[async_trait]
pub trait DocumentSource {
    async fn extract(self) -> Result<Vec<CandidateDocument>, IntakeError>;
}
