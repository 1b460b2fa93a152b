use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;
use crate::secrets::{resolve_secret_optional, SecretError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory staged documents are written to.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    /// Database file path. Defaults to the per-user data directory when absent.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub mail: MailConfig,
    /// Optional object-store mirror. Absent means staged files live only in
    /// the staging directory.
    #[serde(default)]
    pub object_store: Option<ObjectStoreConfig>,
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("uploads")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            database_path: None,
            sweep: SweepConfig::default(),
            dispatch: DispatchConfig::default(),
            mail: MailConfig::default(),
            object_store: None,
        }
    }
}

/// Settings for the email inbox sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Subject keywords a candidate message must match one of.
    #[serde(default = "default_subject_keywords")]
    pub subject_keywords: Vec<String>,
    /// Upper bound on messages examined per sweep.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Seconds between sweeps for callers that poll.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Retry policy for attachment fetches.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_subject_keywords() -> Vec<String> {
    vec![
        "pitch".to_string(),
        "deck".to_string(),
        "investment".to_string(),
    ]
}

fn default_max_results() -> u32 {
    10
}

fn default_poll_interval() -> u64 {
    300
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            subject_keywords: default_subject_keywords(),
            max_results: default_max_results(),
            poll_interval_secs: default_poll_interval(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Settings for job dispatch and supervision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Seconds a job may sit without a terminal transition before the
    /// reconciliation sweep acts on it.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: i64,
    /// Retry policy for queue pushes.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_lease_secs() -> i64 {
    900
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            lease_secs: default_lease_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Mail provider credentials. The bearer token resolves from one of three
/// sources in priority order: direct value, file, environment variable.
/// Token acquisition and refresh happen outside this system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    /// Direct token value. Intended for local testing only.
    #[serde(default)]
    pub token: Option<String>,
    /// Path to a file containing the token.
    #[serde(default)]
    pub token_file: Option<String>,
    /// Name of an environment variable containing the token.
    #[serde(default)]
    pub token_env_var: Option<String>,
}

impl MailConfig {
    /// Resolves the bearer token, or `None` when no source is configured
    /// (the email source is then simply disabled).
    pub fn resolve_token(&self) -> Result<Option<SecretString>, SecretError> {
        resolve_secret_optional(
            self.token.as_deref(),
            self.token_file.as_deref(),
            self.token_env_var.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Root directory of the filesystem-backed object store.
    pub root: PathBuf,
}
