use std::fs;
use std::path::Path;
use std::sync::Arc;

use wordsync_core::{SyncOrchestrator, SyncReport, SyncRequest};

use crate::commands::common::open_database;
use crate::error::CliError;

pub fn run_apply(
    file: &Path,
    device_id: Option<&str>,
    db_path: &Path,
) -> Result<SyncReport, CliError> {
    let mut request: SyncRequest = serde_json::from_str(&fs::read_to_string(file)?)?;
    if let Some(device_id) = device_id {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(CliError::EmptyDeviceId);
        }
        request.device_id = device_id.to_string();
    }

    let db = open_database(db_path)?;
    let report = SyncOrchestrator::new(Arc::new(db)).sync(request)?;

    println!("{}", report.message());
    for failure in &report.failures {
        eprintln!(
            "item {} ({}): {}",
            failure.index,
            failure.word.as_deref().unwrap_or("?"),
            failure.message
        );
    }

    Ok(report)
}
