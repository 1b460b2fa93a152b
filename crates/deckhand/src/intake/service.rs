//! Ingestion orchestration: candidate document in, `(Deck, Job)` pair out.
//!
//! The ordering here is load-bearing. Bytes are staged first, then the
//! deck record, then the pending job, then the queue push. A queue push
//! that still fails after retries is logged and swallowed: the job is
//! already on record as pending with a lease, so the reconciliation
//! sweep re-dispatches it later. A job insert that fails leaves an
//! orphaned deck row behind; decks are append-only and harmless, so no
//! rollback is attempted.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::Stream;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{DispatchConfig, SweepConfig};
use crate::db::deck_repo::{self, DeckRow};
use crate::db::job_repo::{self, JobRow};
use crate::db::{lease_expiry, message_ledger, now_rfc3339, Database, DatabaseError};
use crate::email::MailProvider;
use crate::objectstore::ObjectStore;
use crate::queue::{DispatchQueue, JobMessage};
use crate::retry::RetryPolicy;
use crate::staging::{StagedFile, StagingStore};

use super::candidate::{CandidateDocument, DocumentSource};
use super::error::IntakeError;
use super::sweep::{MailboxScanner, SweptMessage};
use super::upload::UploadSource;

#[derive(Clone)]
pub struct IntakeService {
    db: Database,
    staging: StagingStore,
    queue: Arc<dyn DispatchQueue>,
    object_store: Option<Arc<dyn ObjectStore>>,
    queue_retry: RetryPolicy,
    lease_secs: i64,
}

impl IntakeService {
    pub fn new(
        db: Database,
        staging: StagingStore,
        queue: Arc<dyn DispatchQueue>,
        dispatch: &DispatchConfig,
    ) -> Self {
        Self {
            db,
            staging,
            queue,
            object_store: None,
            queue_retry: dispatch.retry.clone(),
            lease_secs: dispatch.lease_secs,
        }
    }

    /// Adds an object-store mirror for staged documents.
    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    /// Ingests one candidate document: stage, record, dispatch.
    pub async fn ingest(
        &self,
        candidate: CandidateDocument,
    ) -> Result<(DeckRow, JobRow), IntakeError> {
        let span = tracing::info_span!(
            "ingest",
            source = %candidate.source,
            filename = %candidate.filename
        );
        self.ingest_inner(candidate).instrument(span).await
    }

    async fn ingest_inner(
        &self,
        candidate: CandidateDocument,
    ) -> Result<(DeckRow, JobRow), IntakeError> {
        let CandidateDocument {
            filename,
            investor_id,
            source,
            source_metadata,
            bytes,
        } = candidate;

        // The record keeps the filename exactly as the source supplied
        // it; staging and the object store sanitize their on-disk names
        // themselves.
        let staged = self.staging.stage(bytes.into_stream(), &filename).await?;

        let object_path = self.mirror(&staged, &filename).await;

        let metadata_json = match &source_metadata {
            Some(value) => Some(serde_json::to_string(value).map_err(DatabaseError::from)?),
            None => None,
        };

        let deck = DeckRow {
            id: Uuid::new_v4().to_string(),
            investor_id: investor_id.map(|id| id.to_string()),
            filename,
            staging_path: staged.path.display().to_string(),
            object_path,
            content_hash: Some(staged.sha256),
            source: source.as_str().to_string(),
            source_metadata: metadata_json,
            created_at: now_rfc3339(),
        };
        deck_repo::insert(&self.db, &deck)?;

        let job = JobRow::pending(
            &deck.id,
            deck.investor_id.as_deref(),
            &lease_expiry(self.lease_secs),
        );
        job_repo::insert(&self.db, &job)?;

        let message = JobMessage {
            job_id: job.id.clone(),
            investor_id: deck.investor_id.clone(),
            deck_path: deck.staging_path.clone(),
        };
        self.dispatch(&message).await;

        tracing::info!(
            deck_id = %deck.id,
            job_id = %job.id,
            size = staged.size,
            "document ingested"
        );
        Ok((deck, job))
    }

    /// Receives a multipart upload and ingests its file field.
    pub async fn ingest_upload<S, B, E>(
        &self,
        content_type: &str,
        body: S,
    ) -> Result<(DeckRow, JobRow), IntakeError>
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let source = UploadSource::new(content_type, body)?;
        let mut candidates = source.extract().await?;
        // An upload yields exactly one candidate.
        let candidate = candidates
            .pop()
            .ok_or_else(|| IntakeError::MalformedUpload("missing file field".to_string()))?;
        self.ingest(candidate).await
    }

    /// Sweeps the inbox and ingests every new PDF attachment found.
    ///
    /// A message is recorded in the processed ledger only once every
    /// document scanned out of it has been ingested. A document that
    /// fails to ingest is logged and skipped while the rest of the batch
    /// still goes through; its message stays unrecorded so the next
    /// sweep picks it up again.
    pub async fn sweep_inbox(
        &self,
        provider: Arc<dyn MailProvider>,
        config: &SweepConfig,
    ) -> Result<Vec<(DeckRow, JobRow)>, IntakeError> {
        let scanner = MailboxScanner::new(provider, config.clone(), self.db.clone());
        let swept = scanner.scan().await?;

        let mut ingested = Vec::new();
        for SweptMessage {
            message_id,
            candidates,
        } in swept
        {
            let total = candidates.len();
            let mut landed = 0usize;
            for candidate in candidates {
                let filename = candidate.filename.clone();
                match self.ingest(candidate).await {
                    Ok(pair) => {
                        ingested.push(pair);
                        landed += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            message_id = %message_id,
                            filename = %filename,
                            error = %e,
                            "swept document failed to ingest, skipping"
                        );
                    }
                }
            }

            if landed == total {
                message_ledger::mark_processed(&self.db, &message_id)?;
                tracing::info!(
                    message_id = %message_id,
                    documents = landed,
                    "message swept"
                );
            } else {
                tracing::warn!(
                    message_id = %message_id,
                    ingested = landed,
                    failed = total - landed,
                    "message left unrecorded, will be swept again"
                );
            }
        }
        Ok(ingested)
    }

    /// Pushes the job message, retrying per policy. Failure is final here
    /// but not fatal: the pending job is picked up by reconciliation.
    async fn dispatch(&self, message: &JobMessage) {
        let outcome = self
            .queue_retry
            .run("queue enqueue", || self.queue.enqueue(message))
            .await;
        if let Err(e) = outcome {
            tracing::warn!(
                job_id = %message.job_id,
                error = %e,
                "dispatch failed, job stays pending for reconciliation"
            );
        }
    }

    /// Copies a staged file into the object store when one is configured.
    /// Mirror failures only log; the staging copy is the source of truth.
    async fn mirror(&self, staged: &StagedFile, name: &str) -> Option<String> {
        let store = self.object_store.as_ref()?;
        let bytes = match tokio::fs::read(&staged.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    path = %staged.path.display(),
                    error = %e,
                    "object store mirror skipped, staged file unreadable"
                );
                return None;
            }
        };
        match store.upload(name, &bytes).await {
            Ok(location) => Some(location),
            Err(e) => {
                tracing::warn!(error = %e, "object store mirror failed");
                None
            }
        }
    }
}
