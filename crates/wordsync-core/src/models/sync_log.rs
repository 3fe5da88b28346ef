//! Sync audit log model

use serde::{Deserialize, Serialize};

/// Action recorded for a completed sync batch
pub const SYNC_ACTION: &str = "sync";

/// One append-only audit line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: i64,
    pub device_id: String,
    pub action: String,
    pub details: String,
    pub timestamp: String,
}
