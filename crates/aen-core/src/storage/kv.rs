//! Bucketed key-value store on top of a single SQLite file.
//!
//! Each bucket is its own table (`bucket_<name>`) with blob keys and values.
//! Buckets are created on first write; reading a bucket that does not exist
//! behaves like reading a missing key.
//!
//! The connection runs in `EXCLUSIVE` locking mode and takes its lock while
//! opening, so a second handle on the same file (in this process or another)
//! fails to open instead of interleaving writes.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, Transaction, TransactionBehavior};

use crate::error::{AenError, Result};

/// Version stamped into the SQLite header on every read-write open.
const FORMAT_VERSION: i32 = 1;

/// How a store handle may touch its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

/// Key-value store handle with an explicit Closed / Open lifecycle.
pub struct KvStore {
    path: PathBuf,
    mode: AccessMode,
    conn: Option<Mutex<Connection>>,
}

impl KvStore {
    /// Create a closed handle for `path`.
    pub fn new(path: impl Into<PathBuf>, mode: AccessMode) -> Self {
        Self {
            path: path.into(),
            mode,
            conn: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == AccessMode::ReadOnly
    }

    /// Open the database file and take its lock.
    ///
    /// # Errors
    ///
    /// - `AenError::AlreadyOpen` if this handle is open
    /// - `AenError::NotFound` for a read-only open of a missing file
    /// - `AenError::Locked` if another handle holds the file
    pub fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Err(AenError::AlreadyOpen);
        }

        let conn = match self.mode {
            AccessMode::ReadWrite => Connection::open_with_flags(
                &self.path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
            AccessMode::ReadOnly => {
                if !self.path.exists() {
                    return Err(AenError::NotFound(format!(
                        "database file {} not available",
                        self.path.display()
                    )));
                }
                Connection::open_with_flags(
                    &self.path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?
            }
        };

        // Fail fast on a held file instead of waiting for it.
        conn.busy_timeout(Duration::ZERO)?;
        conn.pragma_update_and_check(None, "locking_mode", "EXCLUSIVE", |row| {
            row.get::<_, String>(0)
        })?;
        self.acquire_lock(&conn)?;

        tracing::debug!(path = %self.path.display(), mode = ?self.mode, "database opened");
        self.conn = Some(Mutex::new(conn));
        Ok(())
    }

    fn acquire_lock(&self, conn: &Connection) -> Result<()> {
        let locked = match self.mode {
            // In exclusive locking mode the write lock is kept after commit.
            AccessMode::ReadWrite => conn.execute_batch(&format!(
                "BEGIN EXCLUSIVE; PRAGMA user_version = {}; COMMIT;",
                FORMAT_VERSION
            )),
            AccessMode::ReadOnly => conn
                .query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|_| ()),
        };

        locked.map_err(|err| {
            if is_busy(&err) {
                AenError::Locked(format!(
                    "{} is held open by another handle",
                    self.path.display()
                ))
            } else {
                err.into()
            }
        })
    }

    /// Close the handle and release the file lock.
    pub fn close(&mut self) -> Result<()> {
        let conn = self.conn.take().ok_or(AenError::NotOpen)?;
        let conn = conn
            .into_inner()
            .map_err(|_| AenError::Storage("SQLite connection poisoned".to_string()))?;
        conn.close().map_err(|(_, err)| AenError::from(err))?;

        tracing::debug!(path = %self.path.display(), "database closed");
        Ok(())
    }

    /// Lock the database connection, failing if the handle is closed.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .as_ref()
            .ok_or(AenError::NotOpen)?
            .lock()
            .map_err(|_| AenError::Storage("SQLite connection poisoned".to_string()))
    }

    /// Run `f` inside a read transaction.
    pub fn view<T>(&self, f: impl FnOnce(&Tx<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock_conn()?;
        let tx = Tx {
            inner: conn.transaction_with_behavior(TransactionBehavior::Deferred)?,
            writable: false,
        };
        // Dropping the transaction rolls it back; nothing was written.
        f(&tx)
    }

    /// Run `f` inside a read-write transaction, committed only if `f` succeeds.
    ///
    /// # Errors
    ///
    /// `AenError::ReadOnly` on read-only handles, before `f` runs.
    pub fn update<T>(&self, f: impl FnOnce(&Tx<'_>) -> Result<T>) -> Result<T> {
        if self.is_read_only() {
            return Err(AenError::ReadOnly);
        }

        let mut conn = self.lock_conn()?;
        let tx = Tx {
            inner: conn.transaction_with_behavior(TransactionBehavior::Immediate)?,
            writable: true,
        };
        let out = f(&tx)?;
        tx.inner.commit()?;
        Ok(out)
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// A transaction over the buckets of a [`KvStore`].
pub struct Tx<'conn> {
    inner: Transaction<'conn>,
    writable: bool,
}

impl Tx<'_> {
    fn table(bucket: &str) -> Result<String> {
        if bucket.is_empty()
            || !bucket
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(AenError::InvalidInput(format!(
                "Invalid bucket name: {:?}",
                bucket
            )));
        }
        Ok(format!("bucket_{}", bucket))
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(AenError::ReadOnly)
        }
    }

    pub fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let table = Self::table(bucket)?;
        let found: Option<i64> = self
            .inner
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn ensure_bucket(&self, bucket: &str) -> Result<String> {
        self.ensure_writable()?;
        let table = Self::table(bucket)?;
        self.inner.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (key BLOB PRIMARY KEY, value BLOB NOT NULL);",
            table
        ))?;
        Ok(table)
    }

    /// Value stored under `key`, `None` if the key or the whole bucket is missing.
    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if !self.bucket_exists(bucket)? {
            return Ok(None);
        }
        let table = Self::table(bucket)?;
        let value = self
            .inner
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?", table),
                [key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn contains(&self, bucket: &str, key: &[u8]) -> Result<bool> {
        Ok(self.get(bucket, key)?.is_some())
    }

    /// All pairs in `bucket`, ordered by key.
    pub fn entries(&self, bucket: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if !self.bucket_exists(bucket)? {
            return Ok(Vec::new());
        }
        let table = Self::table(bucket)?;
        let mut stmt = self
            .inner
            .prepare(&format!("SELECT key, value FROM {} ORDER BY key", table))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let table = self.ensure_bucket(bucket)?;
        self.inner.execute(
            &format!("INSERT OR REPLACE INTO {} (key, value) VALUES (?, ?)", table),
            (key, value),
        )?;
        Ok(())
    }

    /// Remove `key`, returning whether it existed.
    pub fn delete(&self, bucket: &str, key: &[u8]) -> Result<bool> {
        self.ensure_writable()?;
        if !self.bucket_exists(bucket)? {
            return Ok(false);
        }
        let table = Self::table(bucket)?;
        let removed = self
            .inner
            .execute(&format!("DELETE FROM {} WHERE key = ?", table), [key])?;
        Ok(removed > 0)
    }
}
