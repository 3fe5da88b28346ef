use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use wordsync_core::export::StoreStatus;
use wordsync_core::models::{DeviceSummary, SyncLogEntry};
use wordsync_core::{Database, EngineConfig};

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct DeviceListItem {
    pub device_id: String,
    pub device_name: String,
    pub last_sync: Option<String>,
    pub last_sync_relative: Option<String>,
    pub last_ip: Option<String>,
    pub word_count: u64,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("WORDSYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from("vocabulary.db"),
        |dir| dir.join("wordsync").join("vocabulary.db"),
    )
}

/// Open the store with engine settings from the environment
pub fn open_database(path: &Path) -> Result<Database, CliError> {
    open_database_with(path, EngineConfig::from_env()?)
}

pub fn open_database_with(path: &Path, config: EngineConfig) -> Result<Database, CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(Database::open(path, config)?)
}

pub fn format_status_lines(status: &StoreStatus) -> Vec<String> {
    vec![
        format!("words:     {}", status.total_words),
        format!("devices:   {}", status.device_count),
        format!(
            "last sync: {}",
            status.last_sync.as_deref().unwrap_or("Never")
        ),
    ]
}

pub fn device_to_list_item(summary: &DeviceSummary) -> DeviceListItem {
    let now_ms = Utc::now().timestamp_millis();
    let device = &summary.device;
    DeviceListItem {
        device_id: device.device_id.clone(),
        device_name: device.device_name.clone(),
        last_sync: device.last_sync.clone(),
        last_sync_relative: device
            .last_sync
            .as_deref()
            .and_then(parse_timestamp_ms)
            .map(|ms| format_relative_time(ms, now_ms)),
        last_ip: device.last_ip.clone(),
        word_count: summary.word_count,
    }
}

pub fn format_device_lines(devices: &[DeviceSummary]) -> Vec<String> {
    devices
        .iter()
        .map(device_to_list_item)
        .map(|item| {
            let short_id = item.device_id.chars().take(12).collect::<String>();
            let last_sync = item.last_sync_relative.as_deref().unwrap_or("never");
            format!(
                "{short_id:<12}  {:<24}  {:>6} words  {last_sync:<10}  {}",
                item.device_name,
                item.word_count,
                item.last_ip.as_deref().unwrap_or("-")
            )
        })
        .collect()
}

pub fn format_log_lines(entries: &[SyncLogEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}  {:<12}  {:<6}  {}",
                entry.timestamp, entry.device_id, entry.action, entry.details
            )
        })
        .collect()
}

/// Milliseconds since the epoch for an RFC 3339 store timestamp
pub fn parse_timestamp_ms(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|date_time| date_time.timestamp_millis())
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
