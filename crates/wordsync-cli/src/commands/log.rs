use std::path::Path;

use wordsync_core::db::{DeviceRepository, SqliteDeviceRepository};

use crate::commands::common::{format_log_lines, open_database};
use crate::error::CliError;

pub fn run_log(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let reader = db.reader()?;
    let entries = SqliteDeviceRepository::new(&reader).recent_logs(limit)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for line in format_log_lines(&entries) {
            println!("{line}");
        }
    }

    Ok(())
}
