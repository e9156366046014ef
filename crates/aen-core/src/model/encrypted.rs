//! Encrypted note records as they are persisted.

use std::fmt;

use age::x25519;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::attachment::{Attachment, EncryptedAttachment};
use super::note::{FileNote, Note};
use crate::crypto::envelope;
use crate::error::{AenError, Result};
use crate::slug::slug;

/// What the body envelope of a note holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    /// UTF-8 note text
    Text,
    /// Raw file content
    File,
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteKind::Text => f.write_str("text"),
            NoteKind::File => f.write_str("file"),
        }
    }
}

/// A note after decryption, by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptedNote {
    Text(Note),
    File(FileNote),
}

/// A persisted note record.
///
/// Title, timestamps, tags and attachment digests are stored in the clear.
/// The body and every attachment are separate age envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NoteRecord", into = "NoteRecord")]
pub struct EncryptedNote {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub ciphertext: String,
    pub kind: NoteKind,
    pub tags: Vec<String>,
    pub attachments: Vec<EncryptedAttachment>,
    /// Public keys the body envelope was sealed for.
    pub recipients: Vec<String>,
}

/// JSON shape of [`EncryptedNote`].
///
/// Records written by the first notebook releases use capitalized field names
/// (`Uuid`, `Time`, `IsFile`, ...), may hold `null` for empty lists and may
/// carry `IsBinary`, the old name of `is_file`. All of that is read; only the
/// snake_case shape is written.
#[derive(Serialize, Deserialize)]
struct NoteRecord {
    #[serde(alias = "Uuid")]
    id: Uuid,
    #[serde(alias = "Time")]
    created_at: DateTime<Utc>,
    #[serde(alias = "Title")]
    title: String,
    #[serde(alias = "Ciphertext")]
    ciphertext: String,
    #[serde(default, alias = "IsFile")]
    is_file: bool,
    #[serde(default, alias = "IsBinary", skip_serializing)]
    is_binary: bool,
    #[serde(default, alias = "Tags", deserialize_with = "null_as_empty")]
    tags: Vec<String>,
    #[serde(default, alias = "Attachments", deserialize_with = "null_as_empty")]
    attachments: Vec<EncryptedAttachment>,
    #[serde(default, deserialize_with = "null_as_empty")]
    recipients: Vec<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<NoteRecord> for EncryptedNote {
    fn from(record: NoteRecord) -> Self {
        let kind = if record.is_file || record.is_binary {
            NoteKind::File
        } else {
            NoteKind::Text
        };
        Self {
            id: record.id,
            created_at: record.created_at,
            title: record.title,
            ciphertext: record.ciphertext,
            kind,
            tags: record.tags,
            attachments: record.attachments,
            recipients: record.recipients,
        }
    }
}

impl From<EncryptedNote> for NoteRecord {
    fn from(note: EncryptedNote) -> Self {
        Self {
            id: note.id,
            created_at: note.created_at,
            title: note.title,
            ciphertext: note.ciphertext,
            is_file: note.kind == NoteKind::File,
            is_binary: false,
            tags: note.tags,
            attachments: note.attachments,
            recipients: note.recipients,
        }
    }
}

impl EncryptedNote {
    /// Storage key of this note.
    pub fn slug(&self) -> String {
        slug(&self.title)
    }

    pub fn is_file(&self) -> bool {
        self.kind == NoteKind::File
    }

    /// Decrypt the body, dispatching on the note kind.
    ///
    /// Attachments are not decrypted; use [`EncryptedNote::decrypt_attachment`].
    pub fn open(&self, identity: &x25519::Identity) -> Result<DecryptedNote> {
        let body = envelope::decrypt(&self.ciphertext, identity)?;
        match self.kind {
            NoteKind::Text => {
                let text = String::from_utf8(body).map_err(|e| {
                    AenError::Decryption(format!("Note text is not valid UTF-8: {}", e))
                })?;
                Ok(DecryptedNote::Text(Note {
                    id: self.id,
                    created_at: self.created_at,
                    title: self.title.clone(),
                    text,
                    attachments: Vec::new(),
                }))
            }
            NoteKind::File => Ok(DecryptedNote::File(FileNote {
                id: self.id,
                created_at: self.created_at,
                title: self.title.clone(),
                content: body,
            })),
        }
    }

    /// Decrypt a text note.
    ///
    /// # Errors
    ///
    /// `AenError::WrongNoteKind` for file notes, checked before any decryption.
    pub fn decrypt_text(&self, identity: &x25519::Identity) -> Result<Note> {
        self.expect_kind(NoteKind::Text)?;
        match self.open(identity)? {
            DecryptedNote::Text(note) => Ok(note),
            DecryptedNote::File(_) => Err(self.wrong_kind(NoteKind::Text)),
        }
    }

    /// Decrypt a file note.
    ///
    /// # Errors
    ///
    /// `AenError::WrongNoteKind` for text notes, checked before any decryption.
    pub fn decrypt_file(&self, identity: &x25519::Identity) -> Result<FileNote> {
        self.expect_kind(NoteKind::File)?;
        match self.open(identity)? {
            DecryptedNote::File(note) => Ok(note),
            DecryptedNote::Text(_) => Err(self.wrong_kind(NoteKind::File)),
        }
    }

    /// Decrypt the attachment at `index` (0-based) without touching the body.
    pub fn decrypt_attachment(
        &self,
        index: usize,
        identity: &x25519::Identity,
    ) -> Result<Attachment> {
        let attachment = self
            .attachments
            .get(index)
            .ok_or(AenError::IndexOutOfRange {
                index,
                count: self.attachments.len(),
            })?;
        attachment.decrypt(identity)
    }

    fn expect_kind(&self, expected: NoteKind) -> Result<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(self.wrong_kind(expected))
        }
    }

    fn wrong_kind(&self, expected: NoteKind) -> AenError {
        AenError::WrongNoteKind {
            expected,
            found: self.kind,
        }
    }

    // --- Tags ---

    /// Append a tag. Duplicates are kept.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.push(tag.into());
    }

    /// Remove the first occurrence of `tag`.
    pub fn remove_tag(&mut self, tag: &str) -> Result<()> {
        let position = self
            .tags
            .iter()
            .position(|t| t == tag)
            .ok_or_else(|| AenError::TagNotFound(tag.to_string()))?;
        self.tags.remove(position);
        Ok(())
    }

    /// Exact, case-sensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    // --- Attachments ---

    pub fn find_attachment_by_sha256(&self, sha256: &str) -> Option<&EncryptedAttachment> {
        self.attachments
            .iter()
            .find(|a| a.digests.sha256.eq_ignore_ascii_case(sha256))
    }

    /// Fail with `DuplicateAttachment` if content with this sha256 is already attached.
    pub fn ensure_not_attached(&self, sha256: &str) -> Result<()> {
        match self.find_attachment_by_sha256(sha256) {
            Some(existing) => Err(AenError::DuplicateAttachment {
                existing: existing.filename.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Append an already sealed attachment, rejecting duplicate content.
    pub fn push_attachment(&mut self, attachment: EncryptedAttachment) -> Result<()> {
        self.ensure_not_attached(&attachment.digests.sha256)?;
        self.attachments.push(attachment);
        Ok(())
    }

    /// Listing marker: `F` file note, `A<n>` attachments or `--`, then `T` or `-` for tags.
    pub fn flags(&self) -> String {
        let mut flags = match self.kind {
            NoteKind::File => "F".to_string(),
            NoteKind::Text if !self.attachments.is_empty() => {
                format!("A{}", self.attachments.len())
            }
            NoteKind::Text => "--".to_string(),
        };
        flags.push(if self.tags.is_empty() { '-' } else { 'T' });
        flags
    }

    // --- Persistence ---

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Sort notes most recent first, the order every listing uses.
pub fn sort_by_recency(notes: &mut [EncryptedNote]) {
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
