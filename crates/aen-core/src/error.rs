//! Error types for aen core operations.
//!
//! Every failure the store can report is a variant here. Callers are expected
//! to match on the kind (not found, wrong key, read-only handle...) and turn
//! it into a user-facing message themselves.

use thiserror::Error;

use crate::model::NoteKind;

/// Result type alias for aen operations.
pub type Result<T> = std::result::Result<T, AenError>;

/// Core error type for aen operations.
#[derive(Debug, Error)]
pub enum AenError {
    /// Operation attempted on a closed database handle
    #[error("Database is not open")]
    NotOpen,

    /// `open` called on a handle that is already open
    #[error("Database is already open")]
    AlreadyOpen,

    /// Write attempted through a read-only handle
    #[error("Database is read-only")]
    ReadOnly,

    /// Another handle holds the database file
    #[error("Database is locked: {0}")]
    Locked(String),

    /// No note stored under the given slug
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// No recipient with the given alias
    #[error("Recipient alias not found: {0}")]
    AliasNotFound(String),

    /// Tag is not present on the note
    #[error("Tag not found: {0}")]
    TagNotFound(String),

    /// Generic resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Positional lookup beyond the current listing
    #[error("Index {index} is out of range ({count} available)")]
    IndexOutOfRange { index: usize, count: usize },

    /// Identity cannot unwrap the envelope, or the envelope is malformed
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Text path used on a file note or the other way around
    #[error("Wrong note kind: expected {expected} note, found {found} note")]
    WrongNoteKind { expected: NoteKind, found: NoteKind },

    /// Attachment content already stored on the note
    #[error("Attachment already present under the name {existing}")]
    DuplicateAttachment { existing: String },

    /// Encryption requested without any recipient
    #[error("No recipients configured")]
    NoRecipients,

    /// Encryption or key handling error
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage backend error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration file error
    #[error("Config error: {0}")]
    Config(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}
