//! Collaborator health probes.
//!
//! Each collaborator is probed independently and reported as its own
//! component status. An unreachable collaborator degrades its component;
//! it never fails the probe as a whole.

use serde::Serialize;

use crate::db::{Database, DatabaseError};
use crate::email::MailProvider;
use crate::objectstore::ObjectStore;
use crate::queue::DispatchQueue;

/// Health of one collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentHealth {
    Connected,
    Error(String),
    NotConfigured,
}

impl ComponentHealth {
    pub fn is_connected(&self) -> bool {
        matches!(self, ComponentHealth::Connected)
    }
}

impl std::fmt::Display for ComponentHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentHealth::Connected => write!(f, "connected"),
            ComponentHealth::Error(e) => write!(f, "error: {}", e),
            ComponentHealth::NotConfigured => write!(f, "not configured"),
        }
    }
}

impl Serialize for ComponentHealth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Point-in-time status of every collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub database: ComponentHealth,
    pub queue: ComponentHealth,
    pub mail: ComponentHealth,
    pub object_store: ComponentHealth,
}

impl HealthReport {
    /// True when any probed component reported an error.
    pub fn degraded(&self) -> bool {
        [&self.database, &self.queue, &self.mail, &self.object_store]
            .iter()
            .any(|c| matches!(c, ComponentHealth::Error(_)))
    }
}

/// Probes every collaborator. Absent collaborators report `not configured`;
/// the object store is presence-only (no I/O probe).
pub async fn check(
    db: &Database,
    queue: &dyn DispatchQueue,
    mail: Option<&dyn MailProvider>,
    object_store: Option<&dyn ObjectStore>,
) -> HealthReport {
    let database = match ping_database(db) {
        Ok(()) => ComponentHealth::Connected,
        Err(e) => ComponentHealth::Error(e.to_string()),
    };

    let queue = match queue.length().await {
        Ok(_) => ComponentHealth::Connected,
        Err(e) => ComponentHealth::Error(e.to_string()),
    };

    let mail = match mail {
        Some(provider) => match provider.profile().await {
            Ok(address) => {
                tracing::debug!(mailbox = %address, "mail provider reachable");
                ComponentHealth::Connected
            }
            Err(e) => ComponentHealth::Error(e.to_string()),
        },
        None => ComponentHealth::NotConfigured,
    };

    let object_store = match object_store {
        Some(_) => ComponentHealth::Connected,
        None => ComponentHealth::NotConfigured,
    };

    HealthReport {
        database,
        queue,
        mail,
        object_store,
    }
}

fn ping_database(db: &Database) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    })?;
    Ok(())
}
