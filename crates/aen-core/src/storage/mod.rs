//! Storage for aen.
//!
//! A [`Database`] wraps one [`KvStore`] file with two buckets:
//!
//! - `notes`: slug -> JSON [`EncryptedNote`](crate::model::EncryptedNote)
//! - `config`: `recipients` -> JSON list of [`Recipient`](crate::model::Recipient)
//!
//! Note operations live behind [`NoteStore`], registry operations behind
//! [`RecipientRegistry`]. Every operation is one transaction, so
//! read-modify-write sequences (adding a recipient, tagging a note) cannot be
//! half applied.

pub mod kv;
mod notes;
mod recipients;
pub mod traits;

use std::path::{Path, PathBuf};

use crate::config::NotebookConfig;
use crate::error::Result;

pub use kv::{AccessMode, KvStore, Tx};
pub use traits::{NoteStore, RecipientRegistry};

pub(crate) const NOTES_BUCKET: &str = "notes";
pub(crate) const CONFIG_BUCKET: &str = "config";
pub(crate) const RECIPIENTS_KEY: &[u8] = b"recipients";

/// Handle to a notebook database file.
pub struct Database {
    kv: KvStore,
}

impl Database {
    /// Closed read-write handle for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_mode(path, AccessMode::ReadWrite)
    }

    /// Closed handle for `path` with the given access mode.
    pub fn with_mode(path: impl Into<PathBuf>, mode: AccessMode) -> Self {
        Self {
            kv: KvStore::new(path, mode),
        }
    }

    /// Closed handle for the database named in `config`.
    pub fn from_config(config: &NotebookConfig) -> Self {
        let mode = if config.database.read_only {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };
        Self::with_mode(config.database_path(), mode)
    }

    pub fn open(&mut self) -> Result<()> {
        self.kv.open()
    }

    pub fn close(&mut self) -> Result<()> {
        self.kv.close()
    }

    pub fn is_open(&self) -> bool {
        self.kv.is_open()
    }

    pub fn is_read_only(&self) -> bool {
        self.kv.is_read_only()
    }

    pub fn path(&self) -> &Path {
        self.kv.path()
    }

    pub(crate) fn kv(&self) -> &KvStore {
        &self.kv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AenError;
    use tempfile::tempdir;

    #[test]
    fn test_database_lifecycle() {
        let dir = tempdir().unwrap();
        let mut db = Database::new(dir.path().join("notes.db"));

        assert!(!db.is_open());
        assert!(matches!(db.list_notes(), Err(AenError::NotOpen)));

        db.open().unwrap();
        assert!(db.is_open());
        assert!(matches!(db.open(), Err(AenError::AlreadyOpen)));
        assert!(db.list_notes().unwrap().is_empty());

        db.close().unwrap();
        assert!(matches!(db.list_recipients(), Err(AenError::NotOpen)));
    }

    #[test]
    fn test_from_config_read_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.db");
        let mut writer = Database::new(&path);
        writer.open().unwrap();
        writer.close().unwrap();

        let mut config = NotebookConfig::new(path.clone(), None);
        config.database.read_only = true;

        let mut db = Database::from_config(&config);
        assert!(db.is_read_only());
        assert_eq!(db.path(), path.as_path());
        db.open().unwrap();
        let identity = age::x25519::Identity::generate();
        let result = db.add_recipient(&crate::model::Recipient::from_identity("x", &identity));
        assert!(matches!(result, Err(AenError::ReadOnly)));
    }
}
