use std::path::Path;

use wordsync_core::export::{active_words, render_words_export};

use crate::cli::ExportFormat;
use crate::commands::common::open_database;
use crate::error::CliError;

pub fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let words = active_words(&db.reader()?)?;
    let rendered = render_words_export(&words, format.into())?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}
