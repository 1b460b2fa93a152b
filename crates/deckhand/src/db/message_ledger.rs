//! Processed message ledger: dedup record for the mailbox sweep.
//!
//! Provider message ids are stable, so one row per handled message is
//! enough. A message recorded here is skipped by later sweeps, not
//! retried.

use rusqlite::params;

use super::{now_rfc3339, Database, DatabaseError};

/// Returns whether the sweep has already handled this message.
pub fn is_processed(db: &Database, message_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM processed_messages WHERE message_id = ?1",
            params![message_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}

/// Records a message as handled. Recording the same id twice is a no-op.
pub fn mark_processed(db: &Database, message_id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO processed_messages (message_id, processed_at)
             VALUES (?1, ?2)",
            params![message_id, now_rfc3339()],
        )?;
        Ok(())
    })
}

/// Counts ledger entries.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 =
            conn.query_row("SELECT COUNT(*) FROM processed_messages", [], |r| r.get(0))?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_unseen_message_is_not_processed() {
        let db = test_db();
        assert!(!is_processed(&db, "msg-1").unwrap());
    }

    #[test]
    fn test_mark_and_check() {
        let db = test_db();
        mark_processed(&db, "msg-1").unwrap();

        assert!(is_processed(&db, "msg-1").unwrap());
        assert!(!is_processed(&db, "msg-2").unwrap());
    }

    #[test]
    fn test_mark_twice_is_noop() {
        let db = test_db();
        mark_processed(&db, "msg-1").unwrap();
        mark_processed(&db, "msg-1").unwrap();

        assert_eq!(count(&db).unwrap(), 1);
    }
}
