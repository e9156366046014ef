//! Plaintext notes.
//!
//! These only live long enough to be sealed into an [`EncryptedNote`]; the
//! store never persists them.

use std::fs;
use std::path::Path;

use age::x25519;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::attachment::{file_name_of, Attachment};
use super::encrypted::{EncryptedNote, NoteKind};
use crate::crypto::envelope;
use crate::error::Result;
use crate::slug::slug;

/// A plaintext text note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl Note {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            title: title.into(),
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    /// Parse the editor format: the first line is the title, the rest is text.
    pub fn from_notefile(contents: &str) -> Self {
        let (title, text) = match contents.split_once('\n') {
            Some((title, text)) => (title, text),
            None => (contents, ""),
        };
        Self::new(title.trim_end_matches('\r'), text)
    }

    /// Render the editor format understood by [`Note::from_notefile`].
    pub fn to_notefile(&self) -> String {
        format!("{}\n{}", self.title, self.text)
    }

    pub fn slug(&self) -> String {
        slug(&self.title)
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Encrypt the text and every attachment for `recipients`.
    ///
    /// The body and each attachment get independent envelopes sealed for the
    /// same recipient list.
    pub fn seal(&self, recipients: &[x25519::Recipient]) -> Result<EncryptedNote> {
        let ciphertext = envelope::encrypt(self.text.as_bytes(), recipients)?;
        let attachments = self
            .attachments
            .iter()
            .map(|attachment| attachment.seal(recipients))
            .collect::<Result<Vec<_>>>()?;

        Ok(EncryptedNote {
            id: self.id,
            created_at: self.created_at,
            title: self.title.clone(),
            ciphertext,
            kind: NoteKind::Text,
            tags: Vec::new(),
            attachments,
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
        })
    }
}

/// A plaintext note whose body is an arbitrary binary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNote {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub content: Vec<u8>,
}

impl FileNote {
    pub fn new(title: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            title: title.into(),
            content,
        }
    }

    /// Read a file note from disk, titled after the file unless `title` is given.
    pub fn from_path(path: &Path, title: Option<&str>) -> Result<Self> {
        let content = fs::read(path)?;
        let title = match title {
            Some(title) if !title.trim().is_empty() => title.to_string(),
            _ => file_name_of(path)?,
        };
        Ok(Self::new(title, content))
    }

    pub fn slug(&self) -> String {
        slug(&self.title)
    }

    pub fn seal(&self, recipients: &[x25519::Recipient]) -> Result<EncryptedNote> {
        Ok(EncryptedNote {
            id: self.id,
            created_at: self.created_at,
            title: self.title.clone(),
            ciphertext: envelope::encrypt(&self.content, recipients)?,
            kind: NoteKind::File,
            tags: Vec::new(),
            attachments: Vec::new(),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use age::x25519::Identity;

    #[test]
    fn test_note_creation() {
        let note = Note::new("Title", "Body");
        assert!(!note.id.is_nil());
        assert_eq!(note.title, "Title");
        assert_eq!(note.text, "Body");
        assert!(note.attachments.is_empty());
        assert!(note.created_at <= Utc::now());
    }

    #[test]
    fn test_notefile_round_trip() {
        let note = Note::from_notefile("Shopping list\neggs\nmilk\n");
        assert_eq!(note.title, "Shopping list");
        assert_eq!(note.text, "eggs\nmilk\n");
        assert_eq!(note.to_notefile(), "Shopping list\neggs\nmilk\n");
    }

    #[test]
    fn test_notefile_title_only() {
        let note = Note::from_notefile("Just a title");
        assert_eq!(note.title, "Just a title");
        assert_eq!(note.text, "");
    }

    #[test]
    fn test_seal_text_note_with_attachments() {
        let identity = Identity::generate();
        let mut note = Note::new("Trip", "packing list");
        note.attach(Attachment::new("map.png", vec![1, 2, 3]));
        note.attach(Attachment::new("ticket.pdf", vec![4, 5, 6]));

        let sealed = note.seal(&[identity.to_public()]).unwrap();

        assert_eq!(sealed.id, note.id);
        assert_eq!(sealed.created_at, note.created_at);
        assert_eq!(sealed.kind, NoteKind::Text);
        assert!(sealed.tags.is_empty());
        assert_eq!(sealed.attachments.len(), 2);
        assert_ne!(sealed.attachments[0].ciphertext, sealed.ciphertext);
        assert_ne!(
            sealed.attachments[0].ciphertext,
            sealed.attachments[1].ciphertext
        );
    }

    #[test]
    fn test_file_note_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.tar");
        fs::write(&path, [0u8, 159, 146, 150]).unwrap();

        let note = FileNote::from_path(&path, None).unwrap();
        assert_eq!(note.title, "backup.tar");
        assert_eq!(note.slug(), "backuptar");
        assert_eq!(note.content, vec![0u8, 159, 146, 150]);

        let titled = FileNote::from_path(&path, Some("Weekly Backup")).unwrap();
        assert_eq!(titled.slug(), "weekly-backup");
    }

    #[test]
    fn test_seal_file_note() {
        let identity = Identity::generate();
        let note = FileNote::new("blob", vec![0xde, 0xad, 0xbe, 0xef]);

        let sealed = note.seal(&[identity.to_public()]).unwrap();
        assert_eq!(sealed.kind, NoteKind::File);
        assert!(sealed.attachments.is_empty());
    }
}
