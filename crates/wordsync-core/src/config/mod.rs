//! Sync engine configuration.
//!
//! Values come from `WORDSYNC_*` environment variables. Parsing goes through
//! [`EngineConfig::from_lookup`] so callers and tests can supply any source.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::util::normalize_text_option;

/// Mutations applied per transaction unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How an edit of a head that is already an edited version is recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditPolicy {
    /// Only the first edit of a root inserts a new version; later edits
    /// update the edited head in place.
    #[default]
    SingleEdit,
    /// Every edit inserts a new version under the same root and tombstones
    /// the previous head.
    BranchEveryEdit,
}

impl EditPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleEdit => "single-edit",
            Self::BranchEveryEdit => "branch-every-edit",
        }
    }
}

impl fmt::Display for EditPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single-edit" | "single_edit" => Ok(Self::SingleEdit),
            "branch-every-edit" | "branch_every_edit" => Ok(Self::BranchEveryEdit),
            other => Err(ConfigError::Invalid(format!(
                "WORDSYNC_EDIT_POLICY must be single-edit or branch-every-edit, got {other}"
            ))),
        }
    }
}

/// Bounded retry with exponential backoff for transient lock contention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delay before the first retry; doubled for each further retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the given zero-based failed attempt
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1_u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Tuning for the store and the sync orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Mutations per sub-batch transaction
    pub batch_size: usize,
    /// `SQLite` busy timeout applied to every connection
    pub busy_timeout: Duration,
    pub retry: RetryPolicy,
    pub edit_policy: EditPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            busy_timeout: Duration::from_millis(5_000),
            retry: RetryPolicy::default(),
            edit_policy: EditPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let batch_size = parse_in_range(&lookup, "WORDSYNC_SYNC_BATCH_SIZE", 20, 1, 500)?;
        let busy_timeout_ms = parse_in_range(&lookup, "WORDSYNC_BUSY_TIMEOUT_MS", 5_000, 0, 60_000)?;
        let attempts = parse_in_range(&lookup, "WORDSYNC_RETRY_ATTEMPTS", 3, 1, 10)?;
        let backoff_ms = parse_in_range(&lookup, "WORDSYNC_RETRY_BACKOFF_MS", 100, 1, 5_000)?;
        let edit_policy = normalize_text_option(lookup("WORDSYNC_EDIT_POLICY"))
            .map_or(Ok(EditPolicy::default()), |value| value.parse())?;

        Ok(Self {
            batch_size: usize::try_from(batch_size)
                .map_err(|_| ConfigError::Invalid("WORDSYNC_SYNC_BATCH_SIZE is too large".into()))?,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            retry: RetryPolicy {
                attempts: u32::try_from(attempts)
                    .map_err(|_| ConfigError::Invalid("WORDSYNC_RETRY_ATTEMPTS is too large".into()))?,
                base_delay: Duration::from_millis(backoff_ms),
            },
            edit_policy,
        })
    }
}

fn parse_in_range(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = normalize_text_option(lookup(name)) else {
        return Ok(default);
    };
    let value = raw.parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!("{name} must be an integer in [{min}, {max}]"))
    })?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{min}, {max}]"
        )));
    }
    Ok(value)
}
