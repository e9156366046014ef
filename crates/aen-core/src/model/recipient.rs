//! Recipients: alias-labeled public keys allowed to read new notes.

use age::x25519;
use serde::{Deserialize, Serialize};

use crate::crypto::envelope::parse_recipient;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Human label, unique within the registry
    #[serde(alias = "Alias")]
    pub alias: String,
    /// `age1...` public key, unique within the registry
    #[serde(alias = "Publickey")]
    pub publickey: String,
}

impl Recipient {
    pub fn new(alias: impl Into<String>, publickey: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            publickey: publickey.into(),
        }
    }

    pub fn from_identity(alias: impl Into<String>, identity: &x25519::Identity) -> Self {
        Self::new(alias, identity.to_public().to_string())
    }

    /// Parse the stored public key.
    pub fn public_key(&self) -> Result<x25519::Recipient> {
        parse_recipient(&self.publickey)
    }
}
