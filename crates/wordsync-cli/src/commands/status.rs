use std::path::Path;

use wordsync_core::export::store_status;

use crate::commands::common::{format_status_lines, open_database};
use crate::error::CliError;

pub fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let status = store_status(&db.reader()?)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in format_status_lines(&status) {
            println!("{line}");
        }
    }

    Ok(())
}
