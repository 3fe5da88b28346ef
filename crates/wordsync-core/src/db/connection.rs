//! Database connection management and the write gate

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::migrations;
use crate::config::{EngineConfig, RetryPolicy};
use crate::error::{Error, Result};

/// The vocabulary store.
///
/// Owns exactly one writer connection, guarded by a process-wide mutex (the
/// write gate). Every mutation runs inside [`WriteGate::transaction`], so at
/// most one transaction from any request holds write access at a time.
/// Readers open their own `query_only` connections and never wait on the gate.
pub struct Database {
    path: PathBuf,
    writer: Mutex<Connection>,
    config: EngineConfig,
}

impl Database {
    /// Open the database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut conn = with_retry(&config.retry, || open_connection(&path, &config))?;
        with_retry(&config.retry, || migrations::run(&mut conn))?;

        tracing::debug!(path = %path.display(), "Opened vocabulary store");
        Ok(Self {
            path,
            writer: Mutex::new(conn),
            config,
        })
    }

    /// Path of the backing database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Acquire the write gate, blocking until no other holder remains.
    ///
    /// The gate is released when the returned guard is dropped.
    pub fn gate(&self) -> WriteGate<'_> {
        let conn = self.writer.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Write gate was poisoned by a panicking holder; recovering");
            PoisonError::into_inner(poisoned)
        });
        WriteGate {
            conn,
            retry: self.config.retry,
        }
    }

    /// Run `f` in one write transaction under the gate.
    pub fn write<T>(&self, f: impl FnMut(&mut Transaction<'_>) -> Result<T>) -> Result<T> {
        self.gate().transaction(f)
    }

    /// Open an independent read-only connection.
    pub fn reader(&self) -> Result<Connection> {
        with_retry(&self.config.retry, || {
            let conn = open_connection(&self.path, &self.config)?;
            conn.pragma_update(None, "query_only", true)?;
            Ok(conn)
        })
    }
}

/// Exclusive write access to the store, held for one sub-batch.
pub struct WriteGate<'a> {
    conn: MutexGuard<'a, Connection>,
    retry: RetryPolicy,
}

impl WriteGate<'_> {
    /// Run `f` inside a `BEGIN IMMEDIATE` transaction and commit it.
    ///
    /// When the engine reports lock contention the attempt is rolled back and
    /// `f` is re-run from scratch after an exponential backoff, up to the
    /// configured attempt budget. Any other error rolls back and is returned.
    pub fn transaction<T>(
        &mut self,
        mut f: impl FnMut(&mut Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let conn = &mut *self.conn;
        with_retry(&self.retry, || {
            let mut tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = f(&mut tx)?;
            tx.commit()?;
            Ok(value)
        })
    }

    /// Write a consistent copy of the store to `target`.
    ///
    /// Runs outside any transaction; `target` must not exist yet.
    pub fn backup_to(&mut self, target: &Path) -> Result<()> {
        let target = target.to_string_lossy();
        let conn = &*self.conn;
        with_retry(&self.retry, || {
            conn.execute("VACUUM INTO ?1", [&*target])?;
            Ok(())
        })
    }
}

/// Retry `op` while it fails with a transient storage error.
pub(crate) fn with_retry<T>(policy: &RetryPolicy, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        match op() {
            Err(error) if error.is_transient() => {
                attempt += 1;
                if attempt >= attempts {
                    tracing::error!(attempts, %error, "Storage contention exhausted retries");
                    return Err(Error::Contention {
                        attempts,
                        message: error.to_string(),
                    });
                }
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(attempt, ?delay, %error, "Storage busy, retrying");
                thread::sleep(delay);
            }
            result => return result,
        }
    }
}

fn open_connection(path: &Path, config: &EngineConfig) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(config.busy_timeout)?;
    configure(&conn)?;
    Ok(conn)
}

/// Configure `SQLite` for concurrent readers alongside one writer
fn configure(conn: &Connection) -> Result<()> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::debug!(mode, "WAL journal mode unavailable");
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn fast_config() -> EngineConfig {
        EngineConfig {
            busy_timeout: Duration::from_millis(10),
            retry: RetryPolicy {
                attempts: 3,
                base_delay: Duration::from_millis(1),
            },
            ..EngineConfig::default()
        }
    }

    fn setup() -> (TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("vocabulary.db"), fast_config()).unwrap();
        (dir, db)
    }

    #[test]
    fn test_open_creates_file() {
        let (dir, db) = setup();
        assert!(dir.path().join("vocabulary.db").exists());
        assert_eq!(db.path(), dir.path().join("vocabulary.db"));
    }

    #[test]
    fn test_write_commits() {
        let (_dir, db) = setup();
        db.write(|tx| {
            tx.execute(
                "INSERT INTO words (word, device_id, date_added) VALUES ('Resolve', 'd1', 'now')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let reader = db.reader().unwrap();
        let count: i64 = reader
            .query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_write_rolls_back_on_error() {
        let (_dir, db) = setup();
        let result: Result<()> = db.write(|tx| {
            tx.execute(
                "INSERT INTO words (word, device_id, date_added) VALUES ('Resolve', 'd1', 'now')",
                [],
            )?;
            Err(Error::InvalidInput("abort".into()))
        });
        assert!(result.is_err());

        let reader = db.reader().unwrap();
        let count: i64 = reader
            .query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_reader_is_query_only() {
        let (_dir, db) = setup();
        let reader = db.reader().unwrap();
        let result = reader.execute(
            "INSERT INTO words (word, device_id, date_added) VALUES ('Resolve', 'd1', 'now')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_contention_exhausts_retry_budget() {
        let (_dir, db) = setup();

        // A foreign connection holding the write lock, as a bulk import would.
        let blocker = Connection::open(db.path()).unwrap();
        blocker.execute_batch("BEGIN IMMEDIATE").unwrap();

        let calls = Cell::new(0);
        let err = db
            .write(|_tx| {
                calls.set(calls.get() + 1);
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, Error::Contention { attempts: 3, .. }));
        assert_eq!(calls.get(), 0);

        blocker.execute_batch("ROLLBACK").unwrap();
        db.write(|_tx| Ok(())).unwrap();
    }

    #[test]
    fn test_with_retry_recovers_after_transient_failure() {
        let policy = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
        };
        let calls = Cell::new(0);
        let value = with_retry(&policy, || {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Err(Error::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                    None,
                )))
            } else {
                Ok(7)
            }
        })
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_with_retry_does_not_retry_permanent_errors() {
        let policy = RetryPolicy::default();
        let calls = Cell::new(0);
        let result: Result<()> = with_retry(&policy, || {
            calls.set(calls.get() + 1);
            Err(Error::InvalidInput("nope".into()))
        });
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(calls.get(), 1);
    }
}
