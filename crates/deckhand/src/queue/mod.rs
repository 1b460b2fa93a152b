//! Dispatch queue for handing jobs to external analysis workers.

mod sqlite;

pub use sqlite::SqliteQueue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DatabaseError;

/// Message handed to an analysis worker. Carries references only; the
/// document bytes stay in the staging store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investor_id: Option<String>,
    pub deck_path: String,
}

/// Errors from queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The backing store rejected the operation.
    #[error("queue storage error: {0}")]
    Storage(#[from] DatabaseError),

    /// The message could not be encoded or decoded.
    #[error("queue encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The transport failed (connectivity, refusal).
    #[error("queue transport error: {0}")]
    Transport(String),
}

/// Transport seam for dispatching job messages.
///
/// At-least-once delivery, FIFO per producer. Implementations move
/// messages; they never inspect or mutate payloads.
#[async_trait]
pub trait DispatchQueue: Send + Sync {
    /// Appends a message to the queue.
    async fn enqueue(&self, message: &JobMessage) -> Result<(), QueueError>;

    /// Number of messages currently waiting.
    async fn length(&self) -> Result<u64, QueueError>;
}
