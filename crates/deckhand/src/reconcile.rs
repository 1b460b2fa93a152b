//! Reconciliation sweep for jobs whose dispatch lease has lapsed.
//!
//! Every job carries a lease timestamp from the moment it is created.
//! Workers do not renew leases; a lapsed lease means the job got stuck
//! somewhere between the queue and a terminal callback. The sweep puts
//! stuck Pending jobs back on the queue and fails stuck Running jobs,
//! so no job waits forever on a lost message or a dead worker.

use crate::db::deck_repo;
use crate::db::job_repo::{self, JobStatus};
use crate::db::{lease_expiry, Database, DatabaseError};
use crate::queue::{DispatchQueue, JobMessage};

/// Error recorded on a job whose worker never reported a terminal status.
pub const LEASE_EXPIRED_ERROR: &str =
    "worker lease expired before a terminal status was reported";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Pending jobs pushed back onto the queue.
    pub requeued: u64,
    /// Running jobs marked failed.
    pub failed: u64,
}

/// Repairs non-terminal jobs whose lease lapsed before `now`.
///
/// Pending jobs are re-enqueued (the deck path re-read from the deck
/// row) and given a fresh lease. Running jobs are marked failed. A
/// queue fault during requeue leaves the job untouched so the next
/// sweep retries it.
pub async fn reconcile(
    db: &Database,
    queue: &dyn DispatchQueue,
    now: &str,
    lease_secs: i64,
) -> Result<ReconcileReport, DatabaseError> {
    let lapsed = job_repo::find_lapsed(db, now)?;
    let mut report = ReconcileReport::default();

    for job in lapsed {
        match job.status {
            JobStatus::Pending => {
                let deck = match deck_repo::find_by_id(db, &job.deck_id)? {
                    Some(deck) => deck,
                    None => {
                        tracing::warn!(
                            job_id = %job.id,
                            deck_id = %job.deck_id,
                            "lapsed job references a missing deck, skipping"
                        );
                        continue;
                    }
                };
                let message = JobMessage {
                    job_id: job.id.clone(),
                    investor_id: job.investor_id.clone(),
                    deck_path: deck.staging_path,
                };
                if let Err(e) = queue.enqueue(&message).await {
                    tracing::warn!(
                        job_id = %job.id,
                        error = %e,
                        "requeue failed, leaving job for the next sweep"
                    );
                    continue;
                }
                job_repo::extend_lease(db, &job.id, &lease_expiry(lease_secs))?;
                tracing::info!(job_id = %job.id, "lapsed pending job re-enqueued");
                report.requeued += 1;
            }
            JobStatus::Running => {
                if job_repo::mark_failed(db, &job.id, LEASE_EXPIRED_ERROR)?.applied() {
                    tracing::info!(job_id = %job.id, "lapsed running job marked failed");
                    report.failed += 1;
                }
            }
            // find_lapsed never returns terminal jobs.
            JobStatus::Completed | JobStatus::Failed => {}
        }
    }

    tracing::info!(
        requeued = report.requeued,
        failed = report.failed,
        "reconciliation sweep complete"
    );
    Ok(report)
}
