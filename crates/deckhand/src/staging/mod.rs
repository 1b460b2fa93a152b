//! Staging area for ingested document bytes.

mod store;

pub use store::{StagedFile, StagingStore};

pub(crate) use store::sanitize_filename;
