//! Attachments and their content digests.

use std::fs;
use std::path::Path;

use age::x25519;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::crypto::envelope;
use crate::error::{AenError, Result};

/// Hex digests of an attachment's content.
///
/// Computed once when the attachment is created. They identify content for
/// duplicate detection; nothing re-checks them against decrypted bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digests {
    #[serde(alias = "Md5")]
    pub md5: String,
    #[serde(alias = "Sha1")]
    pub sha1: String,
    #[serde(alias = "Sha256")]
    pub sha256: String,
    #[serde(alias = "Sha512")]
    pub sha512: String,
}

impl Digests {
    pub fn of(content: &[u8]) -> Self {
        Self {
            md5: format!("{:x}", md5::compute(content)),
            sha1: hex::encode(Sha1::digest(content)),
            sha256: hex::encode(Sha256::digest(content)),
            sha512: hex::encode(Sha512::digest(content)),
        }
    }
}

/// A plaintext attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub digests: Digests,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            digests: Digests::of(&content),
            content,
        }
    }

    /// Read an attachment from disk.
    ///
    /// `filename` overrides the stored name, which otherwise is the file name
    /// component of `path`.
    pub fn from_path(path: &Path, filename: Option<&str>) -> Result<Self> {
        let content = fs::read(path)?;
        let name = match filename {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => file_name_of(path)?,
        };
        Ok(Self::new(name, content))
    }

    /// Encrypt the content into its own envelope.
    pub fn seal(&self, recipients: &[x25519::Recipient]) -> Result<EncryptedAttachment> {
        Ok(EncryptedAttachment {
            filename: self.filename.clone(),
            digests: self.digests.clone(),
            ciphertext: envelope::encrypt(&self.content, recipients)?,
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
        })
    }
}

/// A stored attachment: digests in the clear, content sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAttachment {
    #[serde(alias = "Filename")]
    pub filename: String,
    #[serde(flatten)]
    pub digests: Digests,
    #[serde(alias = "Ciphertext")]
    pub ciphertext: String,
    /// Public keys the envelope was sealed for.
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl EncryptedAttachment {
    pub fn decrypt(&self, identity: &x25519::Identity) -> Result<Attachment> {
        let content = envelope::decrypt(&self.ciphertext, identity)?;
        Ok(Attachment {
            filename: self.filename.clone(),
            digests: self.digests.clone(),
            content,
        })
    }
}

pub(crate) fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| AenError::InvalidInput(format!("No file name in {}", path.display())))
}
