//! Document intake: multipart uploads and inbox sweeps normalized into
//! candidate documents, then staged, recorded, and dispatched.

mod candidate;
mod error;
mod service;
mod sweep;
mod upload;

pub use candidate::{ByteSource, CandidateDocument, DocumentSource, SourceTag};
pub use error::IntakeError;
pub use service::IntakeService;
pub use sweep::{MailboxScanner, SweptMessage};
pub use upload::UploadSource;
