//! # Aen Core
//!
//! Core library for aen - an age encrypted notebook.
//!
//! Notes, file notes and attachments are encrypted for every configured
//! recipient and stored inside a single local database file.
//!
//! ## Architecture
//!
//! - **slug**: title to storage key normalization
//! - **crypto**: age envelopes and key files
//! - **model**: plaintext and encrypted note records
//! - **storage**: bucketed key-value engine, recipient registry, note store
//! - **config**: TOML configuration and default paths

pub mod config;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod model;
pub mod slug;
pub mod storage;

use std::path::Path;

pub use error::{AenError, Result};
pub use model::{
    Attachment, DecryptedNote, EncryptedAttachment, EncryptedNote, FileNote, Note, NoteKind,
    Recipient,
};
pub use slug::slug;
pub use storage::{AccessMode, Database, NoteStore, RecipientRegistry};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open the notebook database at `path`.
///
/// A missing file is an error unless `ensure` is set, in which case the
/// database file is created.
pub fn open_database(path: &Path, ensure: bool) -> Result<Database> {
    if !path.exists() && !ensure {
        return Err(AenError::NotFound(format!(
            "database file {} not available",
            path.display()
        )));
    }

    let mut db = Database::new(path);
    db.open()?;
    Ok(db)
}
