//! Read-only projections of the store for download and export.

use std::fmt::Write as _;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{DeviceRepository, SqliteDeviceRepository, SqliteWordRepository, WordRepository};
use crate::error::Result;
use crate::models::{WordId, WordPayload, WordRecord};

/// Export output format shared by the API and CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// An active word as clients download it.
///
/// Carries the lineage fields and origin device so a client can rebuild
/// history locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportWord {
    pub server_id: WordId,
    pub word: String,
    #[serde(flatten)]
    pub payload: WordPayload,
    pub date_added: String,
    pub device_id: String,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub original_id: Option<WordId>,
}

impl From<WordRecord> for ExportWord {
    fn from(record: WordRecord) -> Self {
        Self {
            server_id: record.id,
            word: record.word,
            payload: record.payload,
            date_added: record.date_added,
            device_id: record.device_id,
            is_deleted: record.is_deleted,
            is_edited: record.is_edited,
            original_id: record.original_id,
        }
    }
}

/// A tombstone, as reported to clients reconciling deletions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedWord {
    pub server_id: WordId,
    pub word: String,
    pub device_id: String,
    pub deleted_at: Option<String>,
}

/// Store-wide counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatus {
    pub total_words: u64,
    pub device_count: u64,
    pub last_sync: Option<String>,
}

/// Active words, newest `date_added` first
pub fn active_words(conn: &Connection) -> Result<Vec<ExportWord>> {
    let words = SqliteWordRepository::new(conn).list_active()?;
    Ok(words.into_iter().map(ExportWord::from).collect())
}

/// Tombstones, most recently deleted first
pub fn deleted_words(conn: &Connection) -> Result<Vec<DeletedWord>> {
    let words = SqliteWordRepository::new(conn).list_deleted()?;
    Ok(words
        .into_iter()
        .map(|record| DeletedWord {
            server_id: record.id,
            word: record.word,
            device_id: record.device_id,
            deleted_at: record.last_synced,
        })
        .collect())
}

pub fn store_status(conn: &Connection) -> Result<StoreStatus> {
    let devices = SqliteDeviceRepository::new(conn);
    Ok(StoreStatus {
        total_words: SqliteWordRepository::new(conn).count_active()?,
        device_count: devices.count()?,
        last_sync: devices.last_sync()?,
    })
}

/// Render words as pretty-printed JSON.
pub fn render_json_export(words: &[ExportWord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(words)
}

/// Render words as a Markdown glossary, one section per word.
#[must_use]
pub fn render_markdown_export(words: &[ExportWord]) -> String {
    let mut output = String::new();

    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }

        let _ = writeln!(output, "## {}", word.word);
        let _ = writeln!(output);
        let _ = writeln!(output, "- category: {}", word.payload.category);
        for (label, value) in [
            ("english", &word.payload.meaning_english),
            ("bangla", &word.payload.meaning_bangla),
            ("synonyms", &word.payload.synonyms),
        ] {
            if !value.is_empty() {
                let _ = writeln!(output, "- {label}: {value}");
            }
        }
        let _ = writeln!(output, "- device: {}", word.device_id);
        let _ = writeln!(output, "- added: {}", word.date_added);
        if !word.payload.example_sentence.is_empty() {
            let _ = writeln!(output);
            let _ = writeln!(output, "> {}", word.payload.example_sentence);
        }
    }

    output
}

/// Render words based on selected export format.
pub fn render_words_export(words: &[ExportWord], format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(words),
        ExportFormat::Markdown => Ok(render_markdown_export(words)),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("wordsync-export-{timestamp_ms}.{}", format.extension())
}
