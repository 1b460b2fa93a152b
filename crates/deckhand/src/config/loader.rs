use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.staging_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "staging_dir must not be empty".to_string(),
        });
    }

    if config.sweep.max_results == 0 {
        return Err(ConfigError::Validation {
            message: "sweep.max_results must be at least 1".to_string(),
        });
    }

    if config.sweep.subject_keywords.is_empty()
        || config.sweep.subject_keywords.iter().any(|k| k.trim().is_empty())
    {
        return Err(ConfigError::Validation {
            message: "sweep.subject_keywords must contain at least one non-empty keyword"
                .to_string(),
        });
    }

    if config.dispatch.lease_secs <= 0 {
        return Err(ConfigError::Validation {
            message: "dispatch.lease_secs must be positive".to_string(),
        });
    }

    for (name, policy) in [
        ("sweep.retry", &config.sweep.retry),
        ("dispatch.retry", &config.dispatch.retry),
    ] {
        if policy.max_attempts == 0 {
            return Err(ConfigError::Validation {
                message: format!("{}.max_attempts must be at least 1", name),
            });
        }
    }

    if let Some(store) = &config.object_store {
        if store.root.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: "object_store.root must not be empty".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_empty_object_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.staging_dir.to_str(), Some("uploads"));
        assert_eq!(config.sweep.max_results, 10);
        assert_eq!(config.dispatch.retry.max_attempts, 3);
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "staging_dir": "/var/lib/deckhand/staging",
            "database_path": "/var/lib/deckhand/deckhand.db",
            "sweep": {
                "subject_keywords": ["pitch", "deck"],
                "max_results": 25,
                "poll_interval_secs": 60,
                "retry": { "max_attempts": 5, "base_delay_ms": 50, "max_delay_ms": 400 }
            },
            "dispatch": {
                "lease_secs": 120,
                "retry": { "max_attempts": 2 }
            },
            "mail": { "token_env_var": "MAIL_TOKEN" },
            "object_store": { "root": "/var/lib/deckhand/objects" }
        }
        "#;
        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.sweep.subject_keywords, vec!["pitch", "deck"]);
        assert_eq!(config.sweep.max_results, 25);
        assert_eq!(config.sweep.retry.max_attempts, 5);
        assert_eq!(config.dispatch.lease_secs, 120);
        assert_eq!(config.dispatch.retry.max_attempts, 2);
        // Omitted retry fields fall back to their defaults.
        assert_eq!(config.dispatch.retry.base_delay_ms, 200);
        assert_eq!(
            config.mail.token_env_var.as_deref(),
            Some("MAIL_TOKEN")
        );
        assert!(config.object_store.is_some());
    }

    #[test]
    fn test_rejects_invalid_json() {
        assert!(load_config_from_str("{ not json").is_err());
    }

    #[test]
    fn test_rejects_zero_max_results() {
        let result = load_config_from_str(r#"{ "sweep": { "max_results": 0 } }"#);
        assert!(matches!(
            result,
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_keyword() {
        let result =
            load_config_from_str(r#"{ "sweep": { "subject_keywords": ["pitch", " "] } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_nonpositive_lease() {
        let result = load_config_from_str(r#"{ "dispatch": { "lease_secs": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_zero_retry_attempts() {
        let result = load_config_from_str(r#"{ "dispatch": { "retry": { "max_attempts": 0 } } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_load_from_file() {
        use assert_fs::prelude::*;

        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("config.json");
        file.write_str(r#"{ "staging_dir": "incoming" }"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.staging_dir.to_str(), Some("incoming"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/no/such/config.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
