//! Word record model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category assigned when a client does not send one
pub const DEFAULT_CATEGORY: &str = "General Vocabulary";

/// Server-assigned identifier of one word version.
///
/// Backed by an `AUTOINCREMENT` rowid, so values are monotonic and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(i64);

impl WordId {
    /// Wrap a raw rowid
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw rowid value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<i64> for WordId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Observability flag recorded on each row; never used for merge decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            other => Err(format!("unknown sync status: {other}")),
        }
    }
}

/// Opaque payload carried by a word version. The merge logic never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPayload {
    pub meaning_bangla: String,
    pub meaning_english: String,
    pub synonyms: String,
    pub example_sentence: String,
    pub category: String,
}

impl Default for WordPayload {
    fn default() -> Self {
        Self {
            meaning_bangla: String::new(),
            meaning_english: String::new(),
            synonyms: String::new(),
            example_sentence: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

/// One version of one vocabulary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    pub id: WordId,
    /// Title-cased display text
    pub word: String,
    #[serde(flatten)]
    pub payload: WordPayload,
    /// Origin device of this version
    pub device_id: String,
    /// Logical creation time, client-supplied or server time
    pub date_added: String,
    /// Server time of the last mutation touching this row
    pub last_synced: Option<String>,
    /// Tombstone flag; never cleared once set
    pub is_deleted: bool,
    pub is_edited: bool,
    /// Lineage root, `None` when this row is itself a root
    pub original_id: Option<WordId>,
    pub sync_status: SyncStatus,
}

impl WordRecord {
    /// Id of the first version in this record's lineage
    #[must_use]
    pub fn lineage_root(&self) -> WordId {
        self.original_id.unwrap_or(self.id)
    }

    /// Whether this row has no lineage parent
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.original_id.is_none()
    }
}

/// Values for a row about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWord {
    pub word: String,
    pub payload: WordPayload,
    pub device_id: String,
    pub date_added: String,
    pub is_edited: bool,
    pub original_id: Option<WordId>,
}
