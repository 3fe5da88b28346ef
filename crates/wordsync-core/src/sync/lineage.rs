//! Lineage lookups. Read-only.

use crate::db::{SqliteWordRepository, WordRepository};
use crate::error::Result;
use crate::models::{WordId, WordRecord};
use rusqlite::Connection;

/// Resolves which stored row an incoming mutation refers to
pub struct LineageResolver<'a> {
    words: SqliteWordRepository<'a>,
}

impl<'a> LineageResolver<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self {
            words: SqliteWordRepository::new(conn),
        }
    }

    /// The unique active row for a (word, device) pair
    pub fn active_head(&self, word: &str, device_id: &str) -> Result<Option<WordRecord>> {
        self.words.find_active(word, device_id)
    }

    /// Every version whose id or `original_id` equals `reference`
    pub fn lineage(&self, reference: WordId) -> Result<Vec<WordRecord>> {
        self.words.find_lineage(reference)
    }

    /// Root of the lineage containing `reference`, if that row exists and
    /// belongs to `device_id`. Lineages never span devices.
    pub fn root_for_device(&self, reference: WordId, device_id: &str) -> Result<Option<WordId>> {
        Ok(self
            .words
            .get(reference)?
            .filter(|record| record.device_id == device_id)
            .map(|record| record.lineage_root()))
    }
}
