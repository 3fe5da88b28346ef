//! Applies one client mutation to the store.
//!
//! Decision order:
//!
//! 1. Delete: by `server_id` tombstones the whole lineage (the row and every
//!    row pointing at it); without it tombstones the active head for
//!    (word, device). Matching nothing is a successful no-op.
//! 2. Edit with `original_id`: the referenced version is superseded first.
//! 3. Record the version against the active head for (word, device):
//!    - edit of a head that is not yet an edited version: tombstone the head
//!      and insert a new row pointing at the lineage root;
//!    - otherwise update the head in place;
//!    - no head: insert a new row.
//!
//! Every row written points at the lineage root, never at an intermediate
//! version.

use rusqlite::Connection;

use super::lineage::LineageResolver;
use crate::config::EditPolicy;
use crate::db::{SqliteWordRepository, WordRepository};
use crate::error::Result;
use crate::models::{NewWord, WordId, WordMutation, WordRecord};
use crate::util::normalize_word;

/// What applying one mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Word text was empty; nothing happened
    Skipped,
    /// Rows were tombstoned
    Deleted { tombstoned: usize },
    /// Delete matched no active row (already applied or never existed)
    AlreadyDeleted,
    /// A new row was inserted; it may carry the lineage root of a superseded `original_id`
    Created { id: WordId },
    /// A new version was inserted and the previous head tombstoned
    Versioned { id: WordId, replaced: WordId },
    /// The active head was updated in place
    Updated { id: WordId },
}

impl MergeOutcome {
    /// Whether the mutation changed stored state and counts as synced
    pub const fn changed_state(self) -> bool {
        !matches!(self, Self::Skipped | Self::AlreadyDeleted)
    }

    /// Row the client should map its local record to
    pub const fn server_id(self) -> Option<WordId> {
        match self {
            Self::Created { id } | Self::Versioned { id, .. } | Self::Updated { id } => Some(id),
            Self::Skipped | Self::Deleted { .. } | Self::AlreadyDeleted => None,
        }
    }
}

/// The per-item merge rules
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine {
    policy: EditPolicy,
}

impl MergeEngine {
    pub const fn new(policy: EditPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> EditPolicy {
        self.policy
    }

    /// Apply one mutation from `device_id` using server time `now`.
    ///
    /// `conn` is expected to be inside a transaction or savepoint owned by
    /// the caller; nothing is committed here.
    pub fn apply(
        &self,
        conn: &Connection,
        device_id: &str,
        mutation: &WordMutation,
        now: &str,
    ) -> Result<MergeOutcome> {
        let Some(word) = normalize_word(&mutation.word) else {
            return Ok(MergeOutcome::Skipped);
        };
        let words = SqliteWordRepository::new(conn);
        let resolver = LineageResolver::new(conn);

        if mutation.is_deleted {
            let tombstoned = match mutation.server_id {
                Some(server_id) => words.tombstone_lineage(server_id, now)?,
                None => words.tombstone_active(&word, device_id, now)?,
            };
            tracing::debug!(%word, device_id, tombstoned, "Applied delete");
            return Ok(if tombstoned == 0 {
                MergeOutcome::AlreadyDeleted
            } else {
                MergeOutcome::Deleted { tombstoned }
            });
        }

        // Root of a lineage the client says this edit belongs to. Resolved
        // before superseding so a missing head can still be re-attached.
        let mut claimed_root = None;
        if mutation.is_edited {
            if let Some(original_id) = mutation.original_id {
                claimed_root = resolver.root_for_device(original_id, device_id)?;
                words.supersede(original_id, now)?;
            }
        }

        let outcome = match resolver.active_head(&word, device_id)? {
            Some(head) if mutation.is_edited && self.branches_from(&head) => {
                let root = head.lineage_root();
                words.supersede(head.id, now)?;
                let id = words.insert(
                    &new_version(&word, device_id, mutation, now, Some(root)),
                    now,
                )?;
                MergeOutcome::Versioned {
                    id,
                    replaced: head.id,
                }
            }
            Some(head) => {
                words.update_payload(
                    head.id,
                    &mutation.payload(),
                    head.is_edited || mutation.is_edited,
                    now,
                )?;
                MergeOutcome::Updated { id: head.id }
            }
            None => {
                let id = words.insert(
                    &new_version(&word, device_id, mutation, now, claimed_root),
                    now,
                )?;
                MergeOutcome::Created { id }
            }
        };

        tracing::debug!(%word, device_id, ?outcome, "Applied mutation");
        Ok(outcome)
    }

    /// Whether an edit of `head` should insert a new version
    const fn branches_from(&self, head: &WordRecord) -> bool {
        match self.policy {
            EditPolicy::SingleEdit => !head.is_edited,
            EditPolicy::BranchEveryEdit => true,
        }
    }
}

fn new_version(
    word: &str,
    device_id: &str,
    mutation: &WordMutation,
    now: &str,
    original_id: Option<WordId>,
) -> NewWord {
    NewWord {
        word: word.to_string(),
        payload: mutation.payload(),
        device_id: device_id.to_string(),
        date_added: mutation.timestamp.clone().unwrap_or_else(|| now.to_string()),
        is_edited: mutation.is_edited,
        original_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::db::Database;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("vocabulary.db"), EngineConfig::default()).unwrap();
        (dir, db)
    }

    fn mutation(value: serde_json::Value) -> WordMutation {
        WordMutation::from_value(value).unwrap()
    }

    fn apply(db: &Database, engine: MergeEngine, device_id: &str, value: serde_json::Value) -> MergeOutcome {
        let mutation = mutation(value);
        db.write(|tx| engine.apply(tx, device_id, &mutation, "2024-05-01T00:00:00.000Z"))
            .unwrap()
    }

    fn get(db: &Database, id: WordId) -> WordRecord {
        let reader = db.reader().unwrap();
        SqliteWordRepository::new(&reader).get(id).unwrap().unwrap()
    }

    fn active(db: &Database) -> Vec<WordRecord> {
        let reader = db.reader().unwrap();
        SqliteWordRepository::new(&reader).list_active().unwrap()
    }

    fn created_id(outcome: MergeOutcome) -> WordId {
        match outcome {
            MergeOutcome::Created { id } => id,
            other => panic!("expected Created, got {other:?}"),
        }
    }

    #[test]
    fn create_inserts_title_cased_root() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();

        let id = created_id(apply(&db, engine, "d1", json!({ "word": "  resolve " })));
        let record = get(&db, id);

        assert_eq!(record.word, "Resolve");
        assert!(record.is_root());
        assert!(!record.is_deleted);
        assert_eq!(record.date_added, "2024-05-01T00:00:00.000Z");
    }

    #[test]
    fn create_keeps_client_timestamp() {
        let (_dir, db) = setup();
        let id = created_id(apply(
            &db,
            MergeEngine::default(),
            "d1",
            json!({ "word": "Resolve", "timestamp": "2023-12-24T10:00:00Z" }),
        ));
        assert_eq!(get(&db, id).date_added, "2023-12-24T10:00:00Z");
    }

    #[test]
    fn empty_word_is_skipped() {
        let (_dir, db) = setup();
        let outcome = apply(&db, MergeEngine::default(), "d1", json!({ "word": "   " }));
        assert_eq!(outcome, MergeOutcome::Skipped);
        assert!(!outcome.changed_state());
        assert!(active(&db).is_empty());
    }

    #[test]
    fn resync_updates_head_in_place() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();
        let id = created_id(apply(&db, engine, "d1", json!({ "word": "X" })));

        let outcome = apply(
            &db,
            engine,
            "d1",
            json!({ "word": "x", "meaning_english": "unknown" }),
        );
        assert_eq!(outcome, MergeOutcome::Updated { id });
        assert_eq!(active(&db).len(), 1);
        assert_eq!(get(&db, id).payload.meaning_english, "unknown");
    }

    #[test]
    fn first_edit_inserts_version_pointing_at_root() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();
        let root = created_id(apply(&db, engine, "D1", json!({ "word": "Resolve" })));

        let outcome = apply(
            &db,
            engine,
            "D1",
            json!({ "word": "Resolve", "is_edited": true, "meaning_english": "settle" }),
        );
        let MergeOutcome::Versioned { id, replaced } = outcome else {
            panic!("expected Versioned, got {outcome:?}");
        };

        assert_eq!(replaced, root);
        let version = get(&db, id);
        assert_eq!(version.original_id, Some(root));
        assert!(version.is_edited);
        assert!(get(&db, root).is_deleted);
    }

    #[test]
    fn lineage_always_points_at_first_row() {
        let (_dir, db) = setup();
        let engine = MergeEngine::new(EditPolicy::BranchEveryEdit);
        let root = created_id(apply(&db, engine, "d1", json!({ "word": "Resolve" })));

        for meaning in ["one", "two", "three"] {
            apply(
                &db,
                engine,
                "d1",
                json!({ "word": "Resolve", "is_edited": true, "meaning_english": meaning }),
            );
        }

        let reader = db.reader().unwrap();
        let lineage = LineageResolver::new(&reader).lineage(root).unwrap();
        assert_eq!(lineage.len(), 4);
        for record in lineage.iter().skip(1) {
            assert_eq!(record.original_id, Some(root));
        }
        assert_eq!(active(&db).len(), 1);
        assert_eq!(active(&db)[0].payload.meaning_english, "three");
    }

    #[test]
    fn single_edit_policy_updates_edited_head_in_place() {
        let (_dir, db) = setup();
        let engine = MergeEngine::new(EditPolicy::SingleEdit);
        let root = created_id(apply(&db, engine, "d1", json!({ "word": "Resolve" })));
        apply(&db, engine, "d1", json!({ "word": "Resolve", "is_edited": true }));

        let head = active(&db).remove(0);
        let outcome = apply(
            &db,
            engine,
            "d1",
            json!({ "word": "Resolve", "is_edited": true, "meaning_english": "second" }),
        );

        assert_eq!(outcome, MergeOutcome::Updated { id: head.id });
        let reader = db.reader().unwrap();
        assert_eq!(LineageResolver::new(&reader).lineage(root).unwrap().len(), 2);
    }

    #[test]
    fn plain_resync_keeps_edited_flag() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();
        apply(&db, engine, "d1", json!({ "word": "Resolve" }));
        apply(&db, engine, "d1", json!({ "word": "Resolve", "is_edited": true }));
        apply(&db, engine, "d1", json!({ "word": "Resolve" }));

        let head = active(&db).remove(0);
        assert!(head.is_edited);
    }

    #[test]
    fn edit_with_original_id_reattaches_to_root() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();
        let root = created_id(apply(&db, engine, "d1", json!({ "word": "Resolve" })));

        let outcome = apply(
            &db,
            engine,
            "d1",
            json!({
                "word": "Resolve",
                "is_edited": true,
                "original_id": root.get(),
                "meaning_english": "settle",
            }),
        );

        let id = created_id(outcome);
        assert_eq!(get(&db, id).original_id, Some(root));
        let old = get(&db, root);
        assert!(old.is_deleted);
        assert!(old.is_edited);
    }

    #[test]
    fn edit_of_intermediate_version_points_at_first_row() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();
        let root = created_id(apply(&db, engine, "d1", json!({ "word": "Resolve" })));
        let first = created_id(apply(
            &db,
            engine,
            "d1",
            json!({ "word": "Resolve", "is_edited": true, "original_id": root.get() }),
        ));

        let second = created_id(apply(
            &db,
            engine,
            "d1",
            json!({
                "word": "Resolve",
                "is_edited": true,
                "original_id": first.get(),
                "meaning_english": "settle",
            }),
        ));

        assert_eq!(get(&db, second).original_id, Some(root));
        assert!(get(&db, first).is_deleted);
        assert_eq!(active(&db).len(), 1);
    }

    #[test]
    fn edit_with_unknown_original_id_starts_new_root() {
        let (_dir, db) = setup();
        let id = created_id(apply(
            &db,
            MergeEngine::default(),
            "d1",
            json!({ "word": "Resolve", "is_edited": true, "original_id": 404 }),
        ));
        assert!(get(&db, id).is_root());
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();
        let id = created_id(apply(&db, engine, "d1", json!({ "word": "Resolve" })));

        let delete = json!({ "word": "Resolve", "is_deleted": true, "server_id": id.get() });
        assert_eq!(
            apply(&db, engine, "d1", delete.clone()),
            MergeOutcome::Deleted { tombstoned: 1 }
        );
        assert_eq!(apply(&db, engine, "d1", delete), MergeOutcome::AlreadyDeleted);
        assert!(get(&db, id).is_deleted);
    }

    #[test]
    fn delete_without_server_id_targets_device_head() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();
        let mine = created_id(apply(&db, engine, "d1", json!({ "word": "Resolve" })));
        let theirs = created_id(apply(&db, engine, "d2", json!({ "word": "Resolve" })));

        let outcome = apply(&db, engine, "d1", json!({ "word": "resolve", "is_deleted": 1 }));
        assert_eq!(outcome, MergeOutcome::Deleted { tombstoned: 1 });
        assert!(get(&db, mine).is_deleted);
        assert!(!get(&db, theirs).is_deleted);
    }

    #[test]
    fn delete_with_zero_server_id_targets_device_head() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();
        let id = created_id(apply(&db, engine, "d1", json!({ "word": "Resolve" })));

        let outcome = apply(
            &db,
            engine,
            "d1",
            json!({ "word": "Resolve", "is_deleted": true, "server_id": 0 }),
        );

        assert_eq!(outcome, MergeOutcome::Deleted { tombstoned: 1 });
        assert!(get(&db, id).is_deleted);
        assert!(active(&db).is_empty());
    }

    #[test]
    fn root_delete_cascades_to_descendants() {
        let (_dir, db) = setup();
        let engine = MergeEngine::new(EditPolicy::BranchEveryEdit);
        let root = created_id(apply(&db, engine, "d1", json!({ "word": "Resolve" })));
        apply(&db, engine, "d1", json!({ "word": "Resolve", "is_edited": true }));
        apply(&db, engine, "d1", json!({ "word": "Resolve", "is_edited": true }));

        let outcome = apply(
            &db,
            engine,
            "d1",
            json!({ "word": "Resolve", "is_deleted": true, "server_id": root.get() }),
        );

        assert_eq!(outcome, MergeOutcome::Deleted { tombstoned: 1 });
        let reader = db.reader().unwrap();
        let lineage = LineageResolver::new(&reader).lineage(root).unwrap();
        assert_eq!(lineage.len(), 3);
        assert!(lineage.iter().all(|record| record.is_deleted));
    }

    #[test]
    fn tombstones_are_never_reactivated() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();
        let id = created_id(apply(&db, engine, "d1", json!({ "word": "Resolve" })));
        apply(&db, engine, "d1", json!({ "word": "Resolve", "is_deleted": true }));

        let recreated = created_id(apply(&db, engine, "d1", json!({ "word": "Resolve" })));
        assert_ne!(recreated, id);
        assert!(get(&db, id).is_deleted);
        assert!(recreated > id);
    }

    #[test]
    fn devices_do_not_interfere() {
        let (_dir, db) = setup();
        let engine = MergeEngine::default();
        apply(&db, engine, "a", json!({ "word": "Resolve", "meaning_english": "a1" }));
        apply(&db, engine, "b", json!({ "word": "Resolve", "meaning_english": "b1" }));
        apply(&db, engine, "a", json!({ "word": "Resolve", "is_edited": true, "meaning_english": "a2" }));

        let active = active(&db);
        assert_eq!(active.len(), 2);
        let b = active.iter().find(|w| w.device_id == "b").unwrap();
        assert_eq!(b.payload.meaning_english, "b1");
        assert!(b.is_root());
    }
}
