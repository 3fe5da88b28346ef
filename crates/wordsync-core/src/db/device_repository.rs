//! Device registry and sync audit log

use crate::error::Result;
use crate::models::{Device, DeviceSummary, SyncLogEntry};
use rusqlite::{params, Connection};

/// Trait for device registry and audit log storage
///
/// The merge engine only writes through this trait; nothing here feeds a
/// merge decision.
pub trait DeviceRepository {
    /// Insert or refresh a device after a sync, keeping its `created_at`
    fn upsert(
        &self,
        device_id: &str,
        device_name: &str,
        last_ip: Option<&str>,
        now: &str,
    ) -> Result<()>;

    /// All devices with their active word counts, most recent sync first
    fn list(&self) -> Result<Vec<DeviceSummary>>;

    /// Number of registered devices
    fn count(&self) -> Result<u64>;

    /// Latest sync time across all devices
    fn last_sync(&self) -> Result<Option<String>>;

    /// Append one audit line
    fn append_log(&self, device_id: &str, action: &str, details: &str, now: &str) -> Result<i64>;

    /// Most recent audit lines, newest first
    fn recent_logs(&self, limit: usize) -> Result<Vec<SyncLogEntry>>;
}

/// `SQLite` implementation of `DeviceRepository`
pub struct SqliteDeviceRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDeviceRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl DeviceRepository for SqliteDeviceRepository<'_> {
    fn upsert(
        &self,
        device_id: &str,
        device_name: &str,
        last_ip: Option<&str>,
        now: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO devices (device_id, device_name, last_sync, last_ip, created_at)
             VALUES (?1, ?2, ?3, ?4, ?3)
             ON CONFLICT(device_id) DO UPDATE SET
                device_name = excluded.device_name,
                last_sync = excluded.last_sync,
                last_ip = excluded.last_ip",
            params![device_id, device_name, now, last_ip],
        )?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<DeviceSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.device_id, d.device_name, d.last_sync, d.last_ip, d.created_at,
                    (SELECT COUNT(*) FROM words w
                     WHERE w.device_id = d.device_id AND w.is_deleted = 0) AS word_count
             FROM devices d
             ORDER BY d.last_sync DESC",
        )?;

        let devices = stmt
            .query_map([], |row| {
                Ok(DeviceSummary {
                    device: Device {
                        device_id: row.get(0)?,
                        device_name: row.get(1)?,
                        last_sync: row.get(2)?,
                        last_ip: row.get(3)?,
                        created_at: row.get(4)?,
                    },
                    word_count: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(devices)
    }

    fn count(&self) -> Result<u64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM devices", [], |row| row.get(0))?;
        Ok(count)
    }

    fn last_sync(&self) -> Result<Option<String>> {
        let last = self
            .conn
            .query_row("SELECT MAX(last_sync) FROM devices", [], |row| row.get(0))?;
        Ok(last)
    }

    fn append_log(&self, device_id: &str, action: &str, details: &str, now: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sync_log (device_id, action, details, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![device_id, action, details, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    #[allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT
    fn recent_logs(&self, limit: usize) -> Result<Vec<SyncLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, device_id, action, details, timestamp
             FROM sync_log
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(SyncLogEntry {
                    id: row.get(0)?,
                    device_id: row.get(1)?,
                    action: row.get(2)?,
                    details: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }
}
