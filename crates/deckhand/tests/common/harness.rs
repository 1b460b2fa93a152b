//! Test harness for isolated intake execution.
//!
//! Every harness gets its own temp directory for staging, an in-memory
//! database with all migrations applied, and a SQLite-backed dispatch
//! queue sharing that database, so tests never touch each other.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use deckhand::config::DispatchConfig;
use deckhand::db::Database;
use deckhand::intake::IntakeService;
use deckhand::queue::{DispatchQueue, SqliteQueue};
use deckhand::staging::StagingStore;

pub struct TestHarness {
    temp_dir: TempDir,
    pub db: Database,
    pub staging: StagingStore,
    pub queue: SqliteQueue,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let staging = StagingStore::new(temp_dir.path().join("staging"));
        let queue = SqliteQueue::new(db.clone());
        Self {
            temp_dir,
            db,
            staging,
            queue,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Intake service wired to the harness queue with default dispatch
    /// settings.
    pub fn service(&self) -> IntakeService {
        self.service_with(Arc::new(self.queue.clone()), &DispatchConfig::default())
    }

    /// Intake service with a custom queue and dispatch settings.
    pub fn service_with(
        &self,
        queue: Arc<dyn DispatchQueue>,
        dispatch: &DispatchConfig,
    ) -> IntakeService {
        IntakeService::new(self.db.clone(), self.staging.clone(), queue, dispatch)
    }
}

pub const TEST_BOUNDARY: &str = "xDeckhandTestBoundaryx";

/// Builds a multipart upload body with an optional `investor_id` field
/// preceding the `file` field. Returns `(content_type, body)`.
pub fn multipart_upload(
    investor_id: Option<&str>,
    filename: &str,
    content: &[u8],
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    if let Some(id) = investor_id {
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"investor_id\"\r\n\r\n{id}\r\n",
                b = TEST_BOUNDARY,
                id = id
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/pdf\r\n\r\n",
            b = TEST_BOUNDARY,
            f = filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{b}--\r\n", b = TEST_BOUNDARY).as_bytes());

    let content_type = format!("multipart/form-data; boundary={}", TEST_BOUNDARY);
    (content_type, body)
}

/// Wraps a body in a single-chunk stream of the shape `ingest_upload` takes.
pub fn body_stream(
    body: Vec<u8>,
) -> impl futures_util::Stream<Item = Result<Vec<u8>, std::convert::Infallible>> + Send + 'static {
    futures_util::stream::iter(vec![Ok(body)])
}
