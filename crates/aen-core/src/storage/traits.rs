//! Storage traits.
//!
//! [`Database`](super::Database) implements both; callers that only need one
//! side (for example a listing view that never writes) can take the narrower
//! bound.

use age::x25519;

use crate::error::Result;
use crate::model::{Attachment, EncryptedNote, FileNote, Note, Recipient};

/// Alias-keyed list of public keys every new envelope is sealed for.
pub trait RecipientRegistry {
    /// Configured recipients in insertion order; empty if none were added yet.
    fn list_recipients(&self) -> Result<Vec<Recipient>>;

    /// Add a recipient.
    ///
    /// - Same public key already present: no-op
    /// - Same alias already present: that entry's public key is replaced
    /// - Otherwise: appended
    ///
    /// # Errors
    ///
    /// `AenError::InvalidInput` if the public key does not parse.
    fn add_recipient(&self, recipient: &Recipient) -> Result<()>;

    /// Remove the recipient labeled `alias`.
    ///
    /// # Errors
    ///
    /// `AenError::AliasNotFound` if no recipient has that alias.
    fn remove_recipient_by_alias(&self, alias: &str) -> Result<()>;

    /// Current public keys, read fresh from storage on every call.
    fn resolve_recipients(&self) -> Result<Vec<x25519::Recipient>>;
}

/// Encrypted note persistence keyed by slug.
pub trait NoteStore {
    /// Write `note` under its slug, replacing whatever is stored there.
    ///
    /// Titles that share a slug overwrite each other; this is not an error.
    ///
    /// # Errors
    ///
    /// `AenError::InvalidInput` if the title has an empty slug.
    fn save_note(&self, note: &EncryptedNote) -> Result<()>;

    /// # Errors
    ///
    /// `AenError::NoteNotFound` if nothing is stored under `slug`.
    fn get_note_by_slug(&self, slug: &str) -> Result<EncryptedNote>;

    /// The `index`-th most recent note (1-based).
    ///
    /// The position is recomputed from the full listing on every call, so it
    /// shifts when notes are added or removed.
    ///
    /// # Errors
    ///
    /// `AenError::IndexOutOfRange` if `index` is 0 or beyond the note count.
    fn get_note_by_index(&self, index: usize) -> Result<EncryptedNote>;

    /// # Errors
    ///
    /// `AenError::NoteNotFound` if nothing is stored under `slug`.
    fn delete_note_by_slug(&self, slug: &str) -> Result<()>;

    /// Every stored note, in storage order (not sorted).
    fn list_notes(&self) -> Result<Vec<EncryptedNote>>;

    /// Notes carrying `tag` (exact, case-sensitive match).
    fn list_notes_by_tag(&self, tag: &str) -> Result<Vec<EncryptedNote>>;

    /// Seal a text note for the current recipients and save it.
    fn write_note(&self, note: &Note) -> Result<EncryptedNote>;

    /// Seal a file note for the current recipients and save it.
    fn write_file_note(&self, note: &FileNote) -> Result<EncryptedNote>;

    /// Seal `attachment` for the current recipients and append it to the note.
    ///
    /// # Errors
    ///
    /// `AenError::DuplicateAttachment` if the note already holds content
    /// with the same sha256.
    fn attach_to_note(&self, slug: &str, attachment: &Attachment) -> Result<EncryptedNote>;

    /// Replace the title and text of a text note.
    ///
    /// The note is decrypted with `identity` first; if that fails nothing is
    /// written. Id, tags and attachments carry over. A title with a new slug
    /// moves the record.
    fn edit_note(
        &self,
        slug: &str,
        identity: &x25519::Identity,
        title: &str,
        text: &str,
    ) -> Result<EncryptedNote>;

    /// Append tags to a note.
    fn add_tags(&self, slug: &str, tags: &[&str]) -> Result<EncryptedNote>;

    /// Remove tags from a note; a missing tag aborts without writing.
    fn remove_tags(&self, slug: &str, tags: &[&str]) -> Result<EncryptedNote>;
}
