use std::path::Path;

use wordsync_core::admin::{erase_all, EraseReport};

use crate::commands::common::open_database;
use crate::error::CliError;

pub fn run_erase(confirmed: bool, db_path: &Path) -> Result<EraseReport, CliError> {
    if !confirmed {
        return Err(CliError::EraseNotConfirmed);
    }
    if !db_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("No store at {}", db_path.display()),
        )
        .into());
    }

    let db = open_database(db_path)?;
    let report = erase_all(&db)?;

    println!("Backup written to {}", report.backup.display());
    println!(
        "Deleted {} words and {} sync log entries",
        report.words_deleted, report.logs_deleted
    );

    Ok(report)
}
