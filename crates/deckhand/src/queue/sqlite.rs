//! SQLite-backed dispatch queue.
//!
//! A `dispatch_queue` table with a monotonic sequence column and a JSON
//! payload, living in the same database file as the records it refers
//! to. Enqueue order is consumption order.

use async_trait::async_trait;
use rusqlite::params;

use super::{DispatchQueue, JobMessage, QueueError};
use crate::db::{now_rfc3339, Database};

#[derive(Clone)]
pub struct SqliteQueue {
    db: Database,
}

impl SqliteQueue {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Removes and returns up to `max` messages, oldest first.
    pub async fn pull(&self, max: u32) -> Result<Vec<JobMessage>, QueueError> {
        let rows: Vec<(i64, String)> = self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT seq, payload FROM dispatch_queue ORDER BY seq ASC LIMIT ?1")?;
            let rows: Vec<(i64, String)> = stmt
                .query_map(params![max], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            for (seq, _) in &rows {
                conn.execute("DELETE FROM dispatch_queue WHERE seq = ?1", params![seq])?;
            }
            Ok(rows)
        })?;

        let mut messages = Vec::with_capacity(rows.len());
        for (_, payload) in rows {
            messages.push(serde_json::from_str(&payload)?);
        }
        Ok(messages)
    }
}

#[async_trait]
impl DispatchQueue for SqliteQueue {
    async fn enqueue(&self, message: &JobMessage) -> Result<(), QueueError> {
        let payload = serde_json::to_string(message)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO dispatch_queue (payload, enqueued_at) VALUES (?1, ?2)",
                params![payload, now_rfc3339()],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    async fn length(&self) -> Result<u64, QueueError> {
        let count = self.db.with_conn(|conn| {
            let count: u64 =
                conn.query_row("SELECT COUNT(*) FROM dispatch_queue", [], |r| r.get(0))?;
            Ok(count)
        })?;
        Ok(count)
    }
}
