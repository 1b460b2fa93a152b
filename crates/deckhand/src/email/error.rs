//! Mail provider error types.

use thiserror::Error;

/// Errors that can occur talking to the mail provider.
#[derive(Error, Debug)]
pub enum MailError {
    /// The HTTP request could not be sent or timed out.
    #[error("Mail request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Mail API returned {status}: {body}")]
    ApiStatus { status: u16, body: String },

    /// The provider response did not match the expected shape.
    #[error("Unexpected mail API response: {0}")]
    InvalidResponse(String),

    /// An attachment body could not be decoded.
    #[error("Failed to decode attachment: {0}")]
    AttachmentDecode(String),

    /// No credentials available for the mail provider.
    #[error("Mail credentials missing: {0}")]
    CredentialsMissing(String),
}

/// Result type for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;
