//! Mailbox access for the email intake source.

pub mod client;
pub mod error;

pub use client::GmailClient;
pub use error::MailError;

use async_trait::async_trait;

/// A message id returned by a mailbox query.
#[derive(Debug, Clone)]
pub struct MessageSummary {
    pub id: String,
}

/// A fetched message reduced to the parts intake cares about.
#[derive(Debug, Clone)]
pub struct MessageDetail {
    pub id: String,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub attachments: Vec<AttachmentRef>,
}

/// Reference to one attachment within a message.
#[derive(Debug, Clone)]
pub struct AttachmentRef {
    pub attachment_id: String,
    pub filename: String,
    pub mime_type: Option<String>,
}

/// Read-only mailbox access used by the inbox sweep.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Lists message ids matching the provider query, bounded by `max`.
    async fn list_messages(&self, query: &str, max: u32)
        -> Result<Vec<MessageSummary>, MailError>;

    /// Fetches headers and attachment references for one message.
    async fn get_message(&self, id: &str) -> Result<MessageDetail, MailError>;

    /// Downloads one attachment body.
    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>, MailError>;

    /// Returns the authenticated mailbox address. Used by health checks.
    async fn profile(&self) -> Result<String, MailError>;
}
