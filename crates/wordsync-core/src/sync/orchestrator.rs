//! Runs one device's sync request against the store.

use std::sync::Arc;

use rusqlite::Transaction;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::merge::{MergeEngine, MergeOutcome};
use crate::db::{Database, DeviceRepository, SqliteDeviceRepository};
use crate::error::Result;
use crate::models::{default_device_name, WordId, WordMutation, SYNC_ACTION};
use crate::util::{normalize_text_option, timestamp_now};

const UNKNOWN_DEVICE: &str = "unknown";

fn unknown_device() -> String {
    UNKNOWN_DEVICE.to_string()
}

/// A device's batch of mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default = "unknown_device")]
    pub device_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    /// Raw items, decoded one by one so a bad item cannot sink the batch
    #[serde(default)]
    pub words: Vec<Value>,
    /// Peer address, filled in by the transport
    #[serde(skip)]
    pub client_ip: Option<String>,
}

impl SyncRequest {
    pub fn new(device_id: impl Into<String>, words: Vec<Value>) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: None,
            words,
            client_ip: None,
        }
    }
}

/// An item that could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Position in the request's `words` array
    pub index: usize,
    pub word: Option<String>,
    pub message: String,
}

/// Result of a sync request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Mutations that changed stored state
    pub synced: usize,
    /// Rows created, versioned or updated, in input order
    pub server_ids: Vec<WordId>,
    pub timestamp: String,
    /// Items with empty word text
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
}

impl SyncReport {
    fn new(timestamp: String) -> Self {
        Self {
            synced: 0,
            server_ids: Vec::new(),
            timestamp,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    fn record(&mut self, outcome: MergeOutcome) {
        if outcome == MergeOutcome::Skipped {
            self.skipped += 1;
        }
        if outcome.changed_state() {
            self.synced += 1;
        }
        if let Some(id) = outcome.server_id() {
            self.server_ids.push(id);
        }
    }

    /// Summary line written to the audit log
    pub fn message(&self) -> String {
        format!("Synced {} items", self.synced)
    }
}

enum ItemResult {
    Applied(MergeOutcome),
    Failed(String),
}

/// Splits requests into sub-batches and feeds them through the write gate
#[derive(Clone)]
pub struct SyncOrchestrator {
    db: Arc<Database>,
    engine: MergeEngine,
    batch_size: usize,
}

impl SyncOrchestrator {
    /// Build an orchestrator using the store's engine configuration
    pub fn new(db: Arc<Database>) -> Self {
        let config = *db.config();
        Self {
            db,
            engine: MergeEngine::new(config.edit_policy),
            batch_size: config.batch_size.max(1),
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Apply every mutation in `request` and record the device's sync.
    ///
    /// Item failures are collected in the report. Errors are returned only
    /// when a sub-batch exhausts its retry budget or finalization fails;
    /// sub-batches committed before that stay committed.
    pub fn sync(&self, request: SyncRequest) -> Result<SyncReport> {
        let now = timestamp_now();
        let device_id = request.device_id;
        let device_name = normalize_text_option(request.device_name)
            .unwrap_or_else(|| default_device_name(&device_id));
        let total = request.words.len();
        let mut report = SyncReport::new(now.clone());

        let mut pending = Vec::with_capacity(total);
        for (index, raw) in request.words.into_iter().enumerate() {
            let word = raw.get("word").and_then(Value::as_str).map(str::to_string);
            match WordMutation::from_value(raw) {
                Ok(mutation) => pending.push((index, mutation)),
                Err(error) => {
                    tracing::warn!(device_id, index, %error, "Rejected malformed item");
                    report.failures.push(ItemFailure {
                        index,
                        word,
                        message: error.to_string(),
                    });
                }
            }
        }

        for chunk in pending.chunks(self.batch_size) {
            let results = self.db.write(|tx| {
                let mut results = Vec::with_capacity(chunk.len());
                for (_, mutation) in chunk {
                    results.push(self.apply_item(tx, &device_id, mutation, &now)?);
                }
                Ok(results)
            })?;

            for ((index, mutation), result) in chunk.iter().zip(results) {
                match result {
                    ItemResult::Applied(outcome) => report.record(outcome),
                    ItemResult::Failed(message) => {
                        tracing::warn!(device_id, index, word = %mutation.word, message, "Skipped item");
                        report.failures.push(ItemFailure {
                            index: *index,
                            word: Some(mutation.word.clone()),
                            message,
                        });
                    }
                }
            }
        }
        report.failures.sort_by_key(|failure| failure.index);

        let details = report.message();
        self.db.write(|tx| {
            let devices = SqliteDeviceRepository::new(tx);
            devices.upsert(&device_id, &device_name, request.client_ip.as_deref(), &now)?;
            devices.append_log(&device_id, SYNC_ACTION, &details, &now)?;
            Ok(())
        })?;

        tracing::info!(
            device_id,
            total,
            synced = report.synced,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Sync complete"
        );
        Ok(report)
    }

    /// Apply one mutation inside its own savepoint.
    ///
    /// Transient storage errors propagate so the gate can retry the whole
    /// sub-batch; anything else rolls back this item only.
    fn apply_item(
        &self,
        tx: &mut Transaction<'_>,
        device_id: &str,
        mutation: &WordMutation,
        now: &str,
    ) -> Result<ItemResult> {
        let savepoint = tx.savepoint()?;
        match self.engine.apply(&savepoint, device_id, mutation, now) {
            Ok(outcome) => {
                savepoint.commit()?;
                Ok(ItemResult::Applied(outcome))
            }
            Err(error) if error.is_transient() => Err(error),
            Err(error) => Ok(ItemResult::Failed(error.to_string())),
        }
    }
}
