//! Object storage for durable document mirrors.

mod filesystem;

pub use filesystem::LocalObjectStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from object store operations.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object write failed for '{name}': {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("object read failed for '{location}': {source}")]
    Read {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("object delete failed for '{location}': {source}")]
    Delete {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object location '{0}'")]
    InvalidLocation(String),
}

/// Durable object storage. Locations returned by `upload` are opaque
/// references understood only by the store that produced them.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores bytes under a fresh location derived from `name`.
    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, ObjectStoreError>;

    /// Fetches the bytes at a location.
    async fn download(&self, location: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Produces a presentable URL for a location, valid for `ttl_secs`.
    async fn signed_url(&self, location: &str, ttl_secs: u64) -> Result<String, ObjectStoreError>;

    /// Removes the object at a location.
    async fn delete(&self, location: &str) -> Result<(), ObjectStoreError>;
}
