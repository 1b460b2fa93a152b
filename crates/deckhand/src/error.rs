use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckhandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Intake error: {0}")]
    Intake(#[from] crate::intake::IntakeError),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Queue error: {0}")]
    Queue(#[from] crate::queue::QueueError),

    #[error("Mail error: {0}")]
    Mail(#[from] crate::email::MailError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] crate::objectstore::ObjectStoreError),

    #[error("Secret resolution error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Errors from the staging store. A staging failure is fatal to the
/// enclosing intake operation; nothing is recorded for the document.
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Failed to create staging directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write staged file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read source bytes for '{name}': {source}")]
    ReadSource {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not find a free staging path for: {0}")]
    PathExhausted(PathBuf),
}

pub type Result<T> = std::result::Result<T, DeckhandError>;
