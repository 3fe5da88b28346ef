use std::path::Path;

use wordsync_core::admin::{cleanup_placeholders, CleanupReport};

use crate::commands::common::open_database;
use crate::error::CliError;

pub fn run_cleanup(db_path: &Path) -> Result<CleanupReport, CliError> {
    let db = open_database(db_path)?;
    let report = cleanup_placeholders(&db)?;

    for field in report.fields.iter().filter(|field| field.cleaned > 0) {
        println!("{:<18} {} cleaned", field.field, field.cleaned);
    }
    println!("Cleaned {} values", report.total());

    Ok(report)
}
