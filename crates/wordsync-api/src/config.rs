use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use thiserror::Error;
use wordsync_core::EngineConfig;

const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Engine(#[from] wordsync_core::ConfigError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    /// Upper bound on a sync request body
    pub max_body_bytes: usize,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "WORDSYNC_BIND_ADDR", "0.0.0.0:8000");
        let db_path = PathBuf::from(value_or_default(&lookup, "WORDSYNC_DB_PATH", "vocabulary.db"));

        let max_body_bytes = match optional_trimmed(&lookup, "WORDSYNC_MAX_BODY_BYTES") {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                ConfigError::Invalid("WORDSYNC_MAX_BODY_BYTES must be a positive integer".to_string())
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };
        if max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "WORDSYNC_MAX_BODY_BYTES must be a positive integer".to_string(),
            ));
        }

        let engine = EngineConfig::from_lookup(&lookup)?;

        Ok(Self {
            bind_addr,
            db_path,
            max_body_bytes,
            engine,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use wordsync_core::EditPolicy;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.db_path, PathBuf::from("vocabulary.db"));
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn config_reads_engine_block() {
        let config = config_from(&[
            ("WORDSYNC_BIND_ADDR", " 127.0.0.1:9000 "),
            ("WORDSYNC_SYNC_BATCH_SIZE", "50"),
            ("WORDSYNC_EDIT_POLICY", "branch-every-edit"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.engine.batch_size, 50);
        assert_eq!(config.engine.edit_policy, EditPolicy::BranchEveryEdit);
    }

    #[test]
    fn config_rejects_invalid_values() {
        let err = config_from(&[("WORDSYNC_MAX_BODY_BYTES", "0")]).unwrap_err();
        assert!(err.to_string().contains("WORDSYNC_MAX_BODY_BYTES"));

        let err = config_from(&[("WORDSYNC_SYNC_BATCH_SIZE", "0")]).unwrap_err();
        assert!(err.to_string().contains("WORDSYNC_SYNC_BATCH_SIZE"));
    }
}
