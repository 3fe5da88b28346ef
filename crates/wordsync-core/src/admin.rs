//! Out-of-band maintenance. Not reachable from sync clients.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::db::Database;
use crate::error::Result;
use crate::models::DEFAULT_CATEGORY;

/// Values left behind by spreadsheet imports in place of empty cells
pub const PLACEHOLDERS: [&str; 3] = ["nan", "None", "<NA>"];

/// Payload columns scanned by [`cleanup_placeholders`], with their replacement
const CLEANUP_FIELDS: [(&str, &str); 5] = [
    ("meaning_bangla", ""),
    ("meaning_english", ""),
    ("synonyms", ""),
    ("example_sentence", ""),
    ("category", DEFAULT_CATEGORY),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EraseReport {
    pub backup: PathBuf,
    pub words_deleted: usize,
    pub logs_deleted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCleanup {
    pub field: &'static str,
    pub cleaned: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub fields: Vec<FieldCleanup>,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.fields.iter().map(|field| field.cleaned).sum()
    }
}

/// Back up the store, then physically delete every word and audit line.
///
/// Device registrations survive. The id sequence is left alone so ids handed
/// out before the erase are never reissued.
pub fn erase_all(db: &Database) -> Result<EraseReport> {
    let backup = backup_path(db.path(), &Utc::now().format("%Y%m%d_%H%M%S").to_string());

    let mut gate = db.gate();
    gate.backup_to(&backup)?;
    tracing::info!(backup = %backup.display(), "Wrote backup before erase");

    let (words_deleted, logs_deleted) = gate.transaction(|tx| {
        let words = tx.execute("DELETE FROM words", [])?;
        let logs = tx.execute("DELETE FROM sync_log", [])?;
        Ok((words, logs))
    })?;

    tracing::warn!(words_deleted, logs_deleted, "Erased vocabulary store");
    Ok(EraseReport {
        backup,
        words_deleted,
        logs_deleted,
    })
}

/// Replace import placeholders in payload columns with real empty values.
pub fn cleanup_placeholders(db: &Database) -> Result<CleanupReport> {
    let report = db.write(|tx| {
        let mut report = CleanupReport::default();
        for (field, replacement) in CLEANUP_FIELDS {
            let cleaned = tx.execute(
                &format!("UPDATE words SET {field} = ?1 WHERE {field} IN (?2, ?3, ?4)"),
                [replacement, PLACEHOLDERS[0], PLACEHOLDERS[1], PLACEHOLDERS[2]],
            )?;
            report.fields.push(FieldCleanup { field, cleaned });
        }
        Ok(report)
    })?;

    tracing::info!(total = report.total(), "Cleaned placeholder values");
    Ok(report)
}

/// `vocabulary.db` -> `vocabulary_backup_<stamp>.db`, in the same directory
fn backup_path(db_path: &Path, stamp: &str) -> PathBuf {
    let stem = db_path
        .file_stem()
        .map_or_else(|| "vocabulary".into(), |stem| stem.to_string_lossy());
    db_path.with_file_name(format!("{stem}_backup_{stamp}.db"))
}
