pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod health;
pub mod intake;
pub mod logging;
pub mod objectstore;
pub mod queue;
pub mod reconcile;
pub mod retry;
pub mod secrets;
pub mod staging;

pub use config::{load_config, Config, DispatchConfig, MailConfig, SweepConfig};
pub use db::{Database, DatabaseError};
pub use email::{GmailClient, MailError, MailProvider};
pub use error::{ConfigError, DeckhandError, Result, StagingError};
pub use health::{ComponentHealth, HealthReport};
pub use intake::{CandidateDocument, DocumentSource, IntakeError, IntakeService};
pub use logging::init_tracing;
pub use objectstore::{LocalObjectStore, ObjectStore, ObjectStoreError};
pub use queue::{DispatchQueue, JobMessage, QueueError, SqliteQueue};
pub use reconcile::{reconcile, ReconcileReport};
pub use retry::RetryPolicy;
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use staging::{StagedFile, StagingStore};
