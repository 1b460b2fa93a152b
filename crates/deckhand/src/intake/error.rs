//! Intake error types.

use thiserror::Error;

/// Errors from document intake. Classification decides the caller's
/// move: malformed input is rejected outright, staging and persistence
/// faults abort the operation, queue faults are absorbed upstream.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// The multipart body was unreadable or missing its file field.
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    /// The investor id field did not parse as a UUID.
    #[error("Invalid investor id: '{0}'")]
    InvalidInvestorId(String),

    /// The staging store could not persist the bytes.
    #[error("Staging failed: {0}")]
    Storage(#[from] crate::error::StagingError),

    /// A record insert or lookup failed.
    #[error("Record store failed: {0}")]
    Persistence(#[from] crate::db::DatabaseError),

    /// The mail provider failed while listing the inbox.
    #[error("Mail provider failed: {0}")]
    Mail(#[from] crate::email::MailError),
}
