//! Note, attachment and recipient records.
//!
//! Plaintext types ([`Note`], [`FileNote`], [`Attachment`]) are transient:
//! they are sealed into [`EncryptedNote`] / [`EncryptedAttachment`] right away
//! and only the encrypted forms reach storage.

pub mod attachment;
pub mod encrypted;
pub mod note;
pub mod recipient;

pub use attachment::{Attachment, Digests, EncryptedAttachment};
pub use encrypted::{sort_by_recency, DecryptedNote, EncryptedNote, NoteKind};
pub use note::{FileNote, Note};
pub use recipient::Recipient;
