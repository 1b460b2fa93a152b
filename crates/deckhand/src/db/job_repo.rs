//! Job repository: lifecycle operations for the `jobs` table.
//!
//! Status transitions are single guarded UPDATE statements so that
//! redelivered queue messages and double-starts are harmless: a
//! transition that does not match its guard reports `NotApplied`
//! instead of overwriting newer state.

use std::fmt;

use rusqlite::{params, Row};
use uuid::Uuid;

use super::{now_rfc3339, Database, DatabaseError};

/// Processing state of a job. Transitions are monotonic:
/// `Pending -> Running -> {Completed, Failed}`, with terminal states final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a guarded status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The row matched the guard and was updated.
    Applied,
    /// No row matched the guard; the job was missing or already past
    /// the requested state. Not an error.
    NotApplied,
}

impl Transition {
    pub fn applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }

    fn from_count(updated: usize) -> Self {
        if updated > 0 {
            Transition::Applied
        } else {
            Transition::NotApplied
        }
    }
}

/// A job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub deck_id: String,
    pub investor_id: Option<String>,
    pub status: JobStatus,
    pub claims: Option<String>,
    pub verification: Option<String>,
    pub report: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub lease_expires_at: Option<String>,
    pub created_at: String,
}

impl JobRow {
    /// Builds a fresh pending job for a deck. Generates the id and
    /// stamps the creation time; the lease expiry comes from the caller
    /// (creation time plus the configured lease duration).
    pub fn pending(deck_id: &str, investor_id: Option<&str>, lease_expires_at: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            deck_id: deck_id.to_string(),
            investor_id: investor_id.map(str::to_string),
            status: JobStatus::Pending,
            claims: None,
            verification: None,
            report: None,
            error: None,
            started_at: None,
            completed_at: None,
            lease_expires_at: Some(lease_expires_at.to_string()),
            created_at: now_rfc3339(),
        }
    }

    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status_text: String = row.get("status")?;
        let status = JobStatus::parse(&status_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown job status '{}'", status_text).into(),
            )
        })?;
        Ok(Self {
            id: row.get("id")?,
            deck_id: row.get("deck_id")?,
            investor_id: row.get("investor_id")?,
            status,
            claims: row.get("claims")?,
            verification: row.get("verification")?,
            report: row.get("report")?,
            error: row.get("error")?,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
            lease_expires_at: row.get("lease_expires_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, deck_id, investor_id, status, claims, verification,
             report, error, started_at, completed_at, lease_expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                job.id,
                job.deck_id,
                job.investor_id,
                job.status.as_str(),
                job.claims,
                job.verification,
                job.report,
                job.error,
                job.started_at,
                job.completed_at,
                job.lease_expires_at,
                job.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists jobs for an investor, newest first.
pub fn list_by_investor(db: &Database, investor_id: &str) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM jobs WHERE investor_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows: Vec<JobRow> = stmt
            .query_map(params![investor_id], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists jobs with the given status, oldest first.
pub fn list_by_status(db: &Database, status: JobStatus) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM jobs WHERE status = ?1 ORDER BY created_at ASC")?;
        let rows: Vec<JobRow> = stmt
            .query_map(params![status.as_str()], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Marks a job as running. Applies only when the job is still pending;
/// stamps `started_at` and extends the lease.
pub fn mark_started(
    db: &Database,
    id: &str,
    lease_expires_at: &str,
) -> Result<Transition, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE jobs SET status = 'running', started_at = ?2, lease_expires_at = ?3
             WHERE id = ?1 AND status = 'pending'",
            params![id, now_rfc3339(), lease_expires_at],
        )?;
        Ok(Transition::from_count(updated))
    })
}

/// Marks a job as completed with its result payloads. Applies only when
/// the job has not already reached a terminal state.
pub fn mark_completed(
    db: &Database,
    id: &str,
    claims: Option<&str>,
    verification: Option<&str>,
    report: Option<&str>,
) -> Result<Transition, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE jobs SET status = 'completed', claims = ?2, verification = ?3,
             report = ?4, completed_at = ?5
             WHERE id = ?1 AND status NOT IN ('completed', 'failed')",
            params![id, claims, verification, report, now_rfc3339()],
        )?;
        Ok(Transition::from_count(updated))
    })
}

/// Marks a job as failed with an error message. Applies only when the
/// job has not already reached a terminal state.
pub fn mark_failed(db: &Database, id: &str, error: &str) -> Result<Transition, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE jobs SET status = 'failed', error = ?2, completed_at = ?3
             WHERE id = ?1 AND status NOT IN ('completed', 'failed')",
            params![id, error, now_rfc3339()],
        )?;
        Ok(Transition::from_count(updated))
    })
}

/// Finds non-terminal jobs whose lease expired before `now`, oldest
/// lease first. Timestamps share one fixed-width RFC 3339 format, so
/// string comparison orders them chronologically.
pub fn find_lapsed(db: &Database, now: &str) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM jobs
             WHERE status IN ('pending', 'running')
               AND lease_expires_at IS NOT NULL
               AND lease_expires_at < ?1
             ORDER BY lease_expires_at ASC",
        )?;
        let rows: Vec<JobRow> = stmt
            .query_map(params![now], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Replaces a job's lease expiry without touching its status.
pub fn extend_lease(db: &Database, id: &str, lease_expires_at: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET lease_expires_at = ?2 WHERE id = ?1",
            params![id, lease_expires_at],
        )?;
        Ok(())
    })
}
