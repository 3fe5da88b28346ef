//! Word repository implementation

use crate::error::Result;
use crate::models::{NewWord, SyncStatus, WordId, WordPayload, WordRecord};
use rusqlite::{params, Connection, OptionalExtension};

const WORD_COLUMNS: &str = "id, word, meaning_bangla, meaning_english, synonyms, example_sentence,
     category, device_id, date_added, last_synced, is_deleted, is_edited, original_id, sync_status";

/// Trait for word storage operations
///
/// Every write takes the server time `now` so that all rows touched by one
/// batch share one `last_synced` value.
pub trait WordRepository {
    /// Get a row by id, tombstoned or not
    fn get(&self, id: WordId) -> Result<Option<WordRecord>>;

    /// The active head for a (word, device) pair
    fn find_active(&self, word: &str, device_id: &str) -> Result<Option<WordRecord>>;

    /// Every row whose id or lineage root equals `id`, oldest first
    fn find_lineage(&self, id: WordId) -> Result<Vec<WordRecord>>;

    /// Insert a new synced row and return its id
    fn insert(&self, word: &NewWord, now: &str) -> Result<WordId>;

    /// Overwrite an active row's payload in place
    fn update_payload(
        &self,
        id: WordId,
        payload: &WordPayload,
        is_edited: bool,
        now: &str,
    ) -> Result<usize>;

    /// Tombstone every active row in the lineage rooted at (or equal to) `id`
    fn tombstone_lineage(&self, id: WordId, now: &str) -> Result<usize>;

    /// Tombstone the active head for a (word, device) pair
    fn tombstone_active(&self, word: &str, device_id: &str, now: &str) -> Result<usize>;

    /// Tombstone one active row because a newer version replaces it
    fn supersede(&self, id: WordId, now: &str) -> Result<usize>;

    /// All active rows, newest `date_added` first
    fn list_active(&self) -> Result<Vec<WordRecord>>;

    /// All tombstones, most recently touched first
    fn list_deleted(&self) -> Result<Vec<WordRecord>>;

    /// Number of active rows
    fn count_active(&self) -> Result<u64>;
}

/// `SQLite` implementation of `WordRepository`
pub struct SqliteWordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteWordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a word from a database row
    fn parse_word(row: &rusqlite::Row<'_>) -> rusqlite::Result<WordRecord> {
        let status: String = row.get(13)?;
        Ok(WordRecord {
            id: WordId::new(row.get(0)?),
            word: row.get(1)?,
            payload: WordPayload {
                meaning_bangla: row.get(2)?,
                meaning_english: row.get(3)?,
                synonyms: row.get(4)?,
                example_sentence: row.get(5)?,
                category: row.get(6)?,
            },
            device_id: row.get(7)?,
            date_added: row.get(8)?,
            last_synced: row.get(9)?,
            is_deleted: row.get::<_, i32>(10)? != 0,
            is_edited: row.get::<_, i32>(11)? != 0,
            original_id: row.get::<_, Option<i64>>(12)?.map(WordId::new),
            sync_status: status.parse().unwrap_or_default(),
        })
    }

    fn query_words(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<WordRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let words = stmt
            .query_map(params, Self::parse_word)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(words)
    }
}

impl WordRepository for SqliteWordRepository<'_> {
    fn get(&self, id: WordId) -> Result<Option<WordRecord>> {
        let word = self
            .conn
            .query_row(
                &format!("SELECT {WORD_COLUMNS} FROM words WHERE id = ?1"),
                params![id.get()],
                Self::parse_word,
            )
            .optional()?;
        Ok(word)
    }

    fn find_active(&self, word: &str, device_id: &str) -> Result<Option<WordRecord>> {
        let word = self
            .conn
            .query_row(
                &format!(
                    "SELECT {WORD_COLUMNS} FROM words
                     WHERE word = ?1 AND device_id = ?2 AND is_deleted = 0"
                ),
                params![word, device_id],
                Self::parse_word,
            )
            .optional()?;
        Ok(word)
    }

    fn find_lineage(&self, id: WordId) -> Result<Vec<WordRecord>> {
        self.query_words(
            &format!(
                "SELECT {WORD_COLUMNS} FROM words
                 WHERE id = ?1 OR original_id = ?1
                 ORDER BY id ASC"
            ),
            params![id.get()],
        )
    }

    fn insert(&self, word: &NewWord, now: &str) -> Result<WordId> {
        self.conn.execute(
            "INSERT INTO words
                (word, meaning_bangla, meaning_english, synonyms, example_sentence, category,
                 date_added, device_id, last_synced, is_deleted, is_edited, original_id, sync_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11, ?12)",
            params![
                word.word,
                word.payload.meaning_bangla,
                word.payload.meaning_english,
                word.payload.synonyms,
                word.payload.example_sentence,
                word.payload.category,
                word.date_added,
                word.device_id,
                now,
                i32::from(word.is_edited),
                word.original_id.map(WordId::get),
                SyncStatus::Synced.as_str(),
            ],
        )?;
        Ok(WordId::new(self.conn.last_insert_rowid()))
    }

    fn update_payload(
        &self,
        id: WordId,
        payload: &WordPayload,
        is_edited: bool,
        now: &str,
    ) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE words SET
                meaning_bangla = ?1,
                meaning_english = ?2,
                synonyms = ?3,
                example_sentence = ?4,
                category = ?5,
                is_edited = ?6,
                last_synced = ?7,
                sync_status = ?8
             WHERE id = ?9 AND is_deleted = 0",
            params![
                payload.meaning_bangla,
                payload.meaning_english,
                payload.synonyms,
                payload.example_sentence,
                payload.category,
                i32::from(is_edited),
                now,
                SyncStatus::Synced.as_str(),
                id.get(),
            ],
        )?;
        Ok(rows)
    }

    fn tombstone_lineage(&self, id: WordId, now: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE words SET is_deleted = 1, last_synced = ?1, sync_status = ?2
             WHERE (id = ?3 OR original_id = ?3) AND is_deleted = 0",
            params![now, SyncStatus::Synced.as_str(), id.get()],
        )?;
        Ok(rows)
    }

    fn tombstone_active(&self, word: &str, device_id: &str, now: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE words SET is_deleted = 1, last_synced = ?1, sync_status = ?2
             WHERE word = ?3 AND device_id = ?4 AND is_deleted = 0",
            params![now, SyncStatus::Synced.as_str(), word, device_id],
        )?;
        Ok(rows)
    }

    fn supersede(&self, id: WordId, now: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE words SET is_deleted = 1, is_edited = 1, last_synced = ?1, sync_status = ?2
             WHERE id = ?3 AND is_deleted = 0",
            params![now, SyncStatus::Synced.as_str(), id.get()],
        )?;
        Ok(rows)
    }

    fn list_active(&self) -> Result<Vec<WordRecord>> {
        self.query_words(
            &format!(
                "SELECT {WORD_COLUMNS} FROM words
                 WHERE is_deleted = 0
                 ORDER BY date_added DESC, id DESC"
            ),
            [],
        )
    }

    fn list_deleted(&self) -> Result<Vec<WordRecord>> {
        self.query_words(
            &format!(
                "SELECT {WORD_COLUMNS} FROM words
                 WHERE is_deleted = 1
                 ORDER BY last_synced DESC, id DESC"
            ),
            [],
        )
    }

    fn count_active(&self) -> Result<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM words WHERE is_deleted = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use pretty_assertions::assert_eq;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrations::run(&mut conn).unwrap();
        conn
    }

    fn new_word(word: &str, device_id: &str, original_id: Option<WordId>) -> NewWord {
        NewWord {
            word: word.to_string(),
            payload: WordPayload::default(),
            device_id: device_id.to_string(),
            date_added: "2024-01-01T00:00:00.000Z".to_string(),
            is_edited: original_id.is_some(),
            original_id,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup();
        let repo = SqliteWordRepository::new(&conn);

        let id = repo.insert(&new_word("Resolve", "d1", None), "t1").unwrap();
        let fetched = repo.get(id).unwrap().unwrap();

        assert_eq!(fetched.word, "Resolve");
        assert_eq!(fetched.device_id, "d1");
        assert_eq!(fetched.last_synced.as_deref(), Some("t1"));
        assert_eq!(fetched.sync_status, SyncStatus::Synced);
        assert!(fetched.is_root());
    }

    #[test]
    fn test_find_active_skips_tombstones() {
        let conn = setup();
        let repo = SqliteWordRepository::new(&conn);

        let id = repo.insert(&new_word("Resolve", "d1", None), "t1").unwrap();
        assert_eq!(repo.find_active("Resolve", "d1").unwrap().unwrap().id, id);
        assert!(repo.find_active("Resolve", "d2").unwrap().is_none());

        assert_eq!(repo.supersede(id, "t2").unwrap(), 1);
        assert!(repo.find_active("Resolve", "d1").unwrap().is_none());

        let old = repo.get(id).unwrap().unwrap();
        assert!(old.is_deleted);
        assert!(old.is_edited);
    }

    #[test]
    fn test_tombstone_lineage_covers_descendants() {
        let conn = setup();
        let repo = SqliteWordRepository::new(&conn);

        let root = repo.insert(&new_word("Resolve", "d1", None), "t1").unwrap();
        repo.supersede(root, "t2").unwrap();
        let child = repo
            .insert(&new_word("Resolve", "d1", Some(root)), "t2")
            .unwrap();

        assert_eq!(repo.find_lineage(root).unwrap().len(), 2);
        // Root already tombstoned, only the child flips.
        assert_eq!(repo.tombstone_lineage(root, "t3").unwrap(), 1);
        assert!(repo.get(child).unwrap().unwrap().is_deleted);
        assert_eq!(repo.tombstone_lineage(root, "t4").unwrap(), 0);
    }

    #[test]
    fn test_update_payload_only_touches_active_rows() {
        let conn = setup();
        let repo = SqliteWordRepository::new(&conn);

        let id = repo.insert(&new_word("Resolve", "d1", None), "t1").unwrap();
        let payload = WordPayload {
            meaning_english: "to settle".to_string(),
            ..WordPayload::default()
        };
        assert_eq!(repo.update_payload(id, &payload, false, "t2").unwrap(), 1);
        assert_eq!(
            repo.get(id).unwrap().unwrap().payload.meaning_english,
            "to settle"
        );

        repo.tombstone_active("Resolve", "d1", "t3").unwrap();
        assert_eq!(repo.update_payload(id, &payload, false, "t4").unwrap(), 0);
    }

    #[test]
    fn test_list_active_and_deleted() {
        let conn = setup();
        let repo = SqliteWordRepository::new(&conn);

        let mut older = new_word("Alpha", "d1", None);
        older.date_added = "2024-01-01T00:00:00.000Z".to_string();
        let mut newer = new_word("Beta", "d1", None);
        newer.date_added = "2024-02-01T00:00:00.000Z".to_string();
        repo.insert(&older, "t1").unwrap();
        let beta = repo.insert(&newer, "t1").unwrap();
        repo.insert(&new_word("Gamma", "d2", None), "t1").unwrap();
        repo.tombstone_active("Gamma", "d2", "t2").unwrap();

        let active = repo.list_active().unwrap();
        let words: Vec<&str> = active.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["Beta", "Alpha"]);
        assert_eq!(active[0].id, beta);
        assert_eq!(repo.count_active().unwrap(), 2);

        let deleted = repo.list_deleted().unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].word, "Gamma");
    }
}
