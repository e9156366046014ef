//! Encrypted note store on the `notes` bucket.

use age::x25519;
use chrono::Utc;

use super::kv::Tx;
use super::recipients::resolve_in;
use super::traits::NoteStore;
use super::{Database, NOTES_BUCKET};
use crate::error::{AenError, Result};
use crate::model::{sort_by_recency, Attachment, EncryptedNote, FileNote, Note};

fn get_in(tx: &Tx<'_>, slug: &str) -> Result<EncryptedNote> {
    let raw = tx
        .get(NOTES_BUCKET, slug.as_bytes())?
        .ok_or_else(|| AenError::NoteNotFound(slug.to_string()))?;
    EncryptedNote::from_json(&raw)
}

fn list_in(tx: &Tx<'_>) -> Result<Vec<EncryptedNote>> {
    tx.entries(NOTES_BUCKET)?
        .into_iter()
        .map(|(_, raw)| EncryptedNote::from_json(&raw))
        .collect()
}

fn put_in(tx: &Tx<'_>, note: &EncryptedNote) -> Result<String> {
    let key = note.slug();
    if key.is_empty() {
        return Err(AenError::InvalidInput(format!(
            "Title {:?} has no usable characters for a slug",
            note.title
        )));
    }

    // Whatever sits under the key is replaced, readable or not.
    if let Some(raw) = tx.get(NOTES_BUCKET, key.as_bytes())? {
        match EncryptedNote::from_json(&raw) {
            Ok(previous) if previous.id != note.id => {
                tracing::warn!(slug = %key, replaced = %previous.id, "slug collision, overwriting note");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(slug = %key, error = %err, "overwriting unreadable note record");
            }
        }
    }

    tx.put(NOTES_BUCKET, key.as_bytes(), &note.to_json()?)?;
    tracing::debug!(slug = %key, id = %note.id, "note saved");
    Ok(key)
}

/// Current recipients, warning when there are none to seal for.
fn recipients_for_write(tx: &Tx<'_>) -> Result<Vec<x25519::Recipient>> {
    let recipients = resolve_in(tx)?;
    if recipients.is_empty() {
        tracing::warn!("recipient registry is empty; refusing to write unreadable note");
    }
    Ok(recipients)
}

fn update_tags(
    db: &Database,
    slug: &str,
    apply: impl FnOnce(&mut EncryptedNote) -> Result<()>,
) -> Result<EncryptedNote> {
    db.kv().update(|tx| {
        let mut note = get_in(tx, slug)?;
        apply(&mut note)?;
        put_in(tx, &note)?;
        Ok(note)
    })
}

impl NoteStore for Database {
    fn save_note(&self, note: &EncryptedNote) -> Result<()> {
        self.kv().update(|tx| put_in(tx, note).map(|_| ()))
    }

    fn get_note_by_slug(&self, slug: &str) -> Result<EncryptedNote> {
        self.kv().view(|tx| get_in(tx, slug))
    }

    fn get_note_by_index(&self, index: usize) -> Result<EncryptedNote> {
        let mut notes = self.list_notes()?;
        let count = notes.len();
        if index == 0 || index > count {
            return Err(AenError::IndexOutOfRange { index, count });
        }
        sort_by_recency(&mut notes);
        Ok(notes.swap_remove(index - 1))
    }

    fn delete_note_by_slug(&self, slug: &str) -> Result<()> {
        self.kv().update(|tx| {
            if !tx.contains(NOTES_BUCKET, slug.as_bytes())? {
                return Err(AenError::NoteNotFound(slug.to_string()));
            }
            tx.delete(NOTES_BUCKET, slug.as_bytes())?;
            tracing::debug!(slug = %slug, "note deleted");
            Ok(())
        })
    }

    fn list_notes(&self) -> Result<Vec<EncryptedNote>> {
        self.kv().view(list_in)
    }

    fn list_notes_by_tag(&self, tag: &str) -> Result<Vec<EncryptedNote>> {
        Ok(self
            .list_notes()?
            .into_iter()
            .filter(|note| note.has_tag(tag))
            .collect())
    }

    fn write_note(&self, note: &Note) -> Result<EncryptedNote> {
        self.kv().update(|tx| {
            let sealed = note.seal(&recipients_for_write(tx)?)?;
            put_in(tx, &sealed)?;
            Ok(sealed)
        })
    }

    fn write_file_note(&self, note: &FileNote) -> Result<EncryptedNote> {
        self.kv().update(|tx| {
            let sealed = note.seal(&recipients_for_write(tx)?)?;
            put_in(tx, &sealed)?;
            Ok(sealed)
        })
    }

    fn attach_to_note(&self, slug: &str, attachment: &Attachment) -> Result<EncryptedNote> {
        self.kv().update(|tx| {
            let mut note = get_in(tx, slug)?;
            note.ensure_not_attached(&attachment.digests.sha256)?;

            let sealed = attachment.seal(&recipients_for_write(tx)?)?;
            note.push_attachment(sealed)?;
            put_in(tx, &note)?;

            tracing::debug!(
                slug = %slug,
                filename = %attachment.filename,
                count = note.attachments.len(),
                "attachment added"
            );
            Ok(note)
        })
    }

    fn edit_note(
        &self,
        slug: &str,
        identity: &x25519::Identity,
        title: &str,
        text: &str,
    ) -> Result<EncryptedNote> {
        self.kv().update(|tx| {
            let existing = get_in(tx, slug)?;
            // Must open before anything is written.
            let mut note = existing.decrypt_text(identity)?;

            note.title = title.to_string();
            note.text = text.to_string();
            note.created_at = Utc::now();

            let recipients = recipients_for_write(tx)?;
            let mut sealed = note.seal(&recipients)?;
            sealed.tags = existing.tags.clone();
            sealed.attachments = existing.attachments.clone();

            let new_slug = sealed.slug();
            if new_slug.is_empty() {
                return Err(AenError::InvalidInput(format!(
                    "Title {:?} has no usable characters for a slug",
                    title
                )));
            }
            if new_slug != slug {
                tx.delete(NOTES_BUCKET, slug.as_bytes())?;
                tracing::debug!(from = %slug, to = %new_slug, "note moved to new slug");
            }
            put_in(tx, &sealed)?;
            Ok(sealed)
        })
    }

    fn add_tags(&self, slug: &str, tags: &[&str]) -> Result<EncryptedNote> {
        update_tags(self, slug, |note| {
            for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                note.add_tag(tag);
            }
            Ok(())
        })
    }

    fn remove_tags(&self, slug: &str, tags: &[&str]) -> Result<EncryptedNote> {
        update_tags(self, slug, |note| {
            for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                note.remove_tag(tag)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NoteKind, Recipient};
    use crate::storage::RecipientRegistry;
    use age::x25519::Identity;
    use chrono::Duration;
    use tempfile::{tempdir, TempDir};

    fn open_db_with(identity: &Identity) -> (TempDir, Database) {
        let dir = tempdir().unwrap();
        let mut db = Database::new(dir.path().join("notes.db"));
        db.open().unwrap();
        db.add_recipient(&Recipient::from_identity("me", identity))
            .unwrap();
        (dir, db)
    }

    fn note_at(title: &str, days_ago: i64) -> Note {
        let mut note = Note::new(title, format!("text of {}", title));
        note.created_at = Utc::now() - Duration::days(days_ago);
        note
    }

    #[test]
    fn test_write_and_get_by_slug() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);

        db.write_note(&Note::new("My First Note", "hello")).unwrap();

        let stored = db.get_note_by_slug("my-first-note").unwrap();
        assert_eq!(stored.decrypt_text(&identity).unwrap().text, "hello");
    }

    #[test]
    fn test_get_missing_slug_fails() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);

        let result = db.get_note_by_slug("nothing-here");
        assert!(matches!(result, Err(AenError::NoteNotFound(slug)) if slug == "nothing-here"));
    }

    #[test]
    fn test_save_round_trip_is_field_equal() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        let mut note = Note::new("Complete", "body");
        note.attach(Attachment::new("a.bin", vec![1, 2, 3]));
        let mut sealed = note.seal(&[identity.to_public()]).unwrap();
        sealed.add_tag("x");

        db.save_note(&sealed).unwrap();
        assert_eq!(db.get_note_by_slug("complete").unwrap(), sealed);
    }

    #[test]
    fn test_save_replaces_unreadable_record() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        db.kv()
            .update(|tx| tx.put(NOTES_BUCKET, b"hello", b"{not json"))
            .unwrap();
        assert!(matches!(
            db.get_note_by_slug("hello"),
            Err(AenError::Json { .. })
        ));

        db.write_note(&Note::new("Hello", "fresh")).unwrap();

        let stored = db.get_note_by_slug("hello").unwrap();
        assert_eq!(stored.decrypt_text(&identity).unwrap().text, "fresh");
    }

    #[test]
    fn test_empty_slug_rejected() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);

        let result = db.write_note(&Note::new("?!", "body"));
        assert!(matches!(result, Err(AenError::InvalidInput(_))));
        assert!(db.list_notes().unwrap().is_empty());
    }

    #[test]
    fn test_write_without_recipients_fails() {
        let dir = tempdir().unwrap();
        let mut db = Database::new(dir.path().join("notes.db"));
        db.open().unwrap();

        let result = db.write_note(&Note::new("Lonely", "nobody can read this"));
        assert!(matches!(result, Err(AenError::NoRecipients)));
        assert!(db.list_notes().unwrap().is_empty());
    }

    #[test]
    fn test_get_by_index_most_recent_first() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        db.write_note(&note_at("Oldest", 3)).unwrap();
        db.write_note(&note_at("Newest", 0)).unwrap();
        db.write_note(&note_at("Middle", 1)).unwrap();

        assert_eq!(db.get_note_by_index(1).unwrap().title, "Newest");
        assert_eq!(db.get_note_by_index(2).unwrap().title, "Middle");
        assert_eq!(db.get_note_by_index(3).unwrap().title, "Oldest");
    }

    #[test]
    fn test_get_by_index_out_of_range() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        db.write_note(&note_at("Only", 0)).unwrap();

        assert!(matches!(
            db.get_note_by_index(2),
            Err(AenError::IndexOutOfRange { index: 2, count: 1 })
        ));
        assert!(matches!(
            db.get_note_by_index(0),
            Err(AenError::IndexOutOfRange { index: 0, count: 1 })
        ));
    }

    #[test]
    fn test_index_shifts_after_delete() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        db.write_note(&note_at("Older", 1)).unwrap();
        db.write_note(&note_at("Latest", 0)).unwrap();

        let first = db.get_note_by_index(1).unwrap();
        assert_eq!(first.title, "Latest");

        db.delete_note_by_slug(&first.slug()).unwrap();
        assert_eq!(db.get_note_by_index(1).unwrap().title, "Older");
    }

    #[test]
    fn test_delete_missing_slug_fails() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);

        let result = db.delete_note_by_slug("ghost");
        assert!(matches!(result, Err(AenError::NoteNotFound(_))));
    }

    #[test]
    fn test_slug_collision_overwrites() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);

        db.write_note(&Note::new("Hello, World", "first")).unwrap();
        db.write_note(&Note::new("Hello World", "second")).unwrap();

        let notes = db.list_notes().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].slug(), "hello-world");
        assert_eq!(notes[0].title, "Hello World");
        assert_eq!(notes[0].decrypt_text(&identity).unwrap().text, "second");
    }

    #[test]
    fn test_list_by_tag_exact_match() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        db.write_note(&Note::new("One", "1")).unwrap();
        db.write_note(&Note::new("Two", "2")).unwrap();
        db.write_note(&Note::new("Three", "3")).unwrap();
        db.add_tags("one", &["work"]).unwrap();
        db.add_tags("two", &["Work"]).unwrap();
        db.add_tags("three", &["home", "work"]).unwrap();

        let mut titles: Vec<_> = db
            .list_notes_by_tag("work")
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["One", "Three"]);
        assert!(db.list_notes_by_tag("nothing").unwrap().is_empty());
    }

    #[test]
    fn test_tag_round_trip_through_store() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        db.write_note(&Note::new("Tagged", "x")).unwrap();

        db.add_tags("tagged", &["First", " Second ", "Third"])
            .unwrap();
        db.remove_tags("tagged", &["Second"]).unwrap();

        assert_eq!(
            db.get_note_by_slug("tagged").unwrap().tags,
            vec!["First", "Third"]
        );
    }

    #[test]
    fn test_remove_missing_tag_writes_nothing() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        db.write_note(&Note::new("Tagged", "x")).unwrap();
        db.add_tags("tagged", &["a", "b"]).unwrap();

        let result = db.remove_tags("tagged", &["a", "missing"]);
        assert!(matches!(result, Err(AenError::TagNotFound(_))));
        assert_eq!(db.get_note_by_slug("tagged").unwrap().tags, vec!["a", "b"]);
    }

    #[test]
    fn test_attach_and_reject_duplicate() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        db.write_note(&Note::new("Files", "x")).unwrap();

        let note = db
            .attach_to_note("files", &Attachment::new("a.txt", b"payload".to_vec()))
            .unwrap();
        assert_eq!(note.attachments.len(), 1);

        let result = db.attach_to_note("files", &Attachment::new("b.txt", b"payload".to_vec()));
        assert!(matches!(
            result,
            Err(AenError::DuplicateAttachment { existing }) if existing == "a.txt"
        ));

        let stored = db.get_note_by_slug("files").unwrap();
        assert_eq!(stored.attachments.len(), 1);
        assert_eq!(
            stored.decrypt_attachment(0, &identity).unwrap().content,
            b"payload"
        );
    }

    #[test]
    fn test_attachment_uses_current_recipients() {
        let first = Identity::generate();
        let second = Identity::generate();
        let (_dir, db) = open_db_with(&first);
        db.write_note(&Note::new("Shared later", "x")).unwrap();

        db.add_recipient(&Recipient::from_identity("second", &second))
            .unwrap();
        let note = db
            .attach_to_note("shared-later", &Attachment::new("late.txt", b"late".to_vec()))
            .unwrap();

        assert!(note.decrypt_text(&second).is_err());
        assert_eq!(note.decrypt_attachment(0, &second).unwrap().content, b"late");
        assert_eq!(note.attachments[0].recipients.len(), 2);
        assert_eq!(note.recipients.len(), 1);
    }

    #[test]
    fn test_write_file_note() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);

        db.write_file_note(&FileNote::new("Scan 01", vec![0, 1, 2, 255]))
            .unwrap();

        let stored = db.get_note_by_slug("scan-01").unwrap();
        assert_eq!(stored.kind, NoteKind::File);
        assert!(matches!(
            stored.decrypt_text(&identity),
            Err(AenError::WrongNoteKind { .. })
        ));
        assert_eq!(
            stored.decrypt_file(&identity).unwrap().content,
            vec![0, 1, 2, 255]
        );
    }

    #[test]
    fn test_edit_note_moves_slug_and_keeps_metadata() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        let original = db.write_note(&Note::new("Draft", "v1")).unwrap();
        db.add_tags("draft", &["wip"]).unwrap();
        db.attach_to_note("draft", &Attachment::new("a.txt", b"a".to_vec()))
            .unwrap();

        let edited = db.edit_note("draft", &identity, "Final", "v2").unwrap();

        assert_eq!(edited.id, original.id);
        assert!(matches!(
            db.get_note_by_slug("draft"),
            Err(AenError::NoteNotFound(_))
        ));
        let stored = db.get_note_by_slug("final").unwrap();
        assert_eq!(stored.decrypt_text(&identity).unwrap().text, "v2");
        assert_eq!(stored.tags, vec!["wip"]);
        assert_eq!(stored.attachments.len(), 1);
    }

    #[test]
    fn test_edit_with_wrong_identity_leaves_record() {
        let identity = Identity::generate();
        let stranger = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        db.write_note(&Note::new("Keep", "original")).unwrap();
        let before = db.get_note_by_slug("keep").unwrap();

        let result = db.edit_note("keep", &stranger, "Changed", "new text");
        assert!(matches!(result, Err(AenError::Decryption(_))));

        assert_eq!(db.get_note_by_slug("keep").unwrap(), before);
        assert!(matches!(
            db.get_note_by_slug("changed"),
            Err(AenError::NoteNotFound(_))
        ));
    }

    #[test]
    fn test_edit_file_note_rejected() {
        let identity = Identity::generate();
        let (_dir, db) = open_db_with(&identity);
        db.write_file_note(&FileNote::new("Binary", vec![1])).unwrap();

        let result = db.edit_note("binary", &identity, "Binary", "text");
        assert!(matches!(result, Err(AenError::WrongNoteKind { .. })));
    }
}
