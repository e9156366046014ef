//! Recipient registry stored in the `config` bucket.

use age::x25519;
use serde::Deserialize;

use super::kv::Tx;
use super::traits::RecipientRegistry;
use super::{Database, CONFIG_BUCKET, RECIPIENTS_KEY};
use crate::crypto::keyfile::default_alias;
use crate::error::{AenError, Result};
use crate::model::Recipient;

/// Accepted shapes of the `recipients` value.
///
/// Early databases stored a bare list of public keys, or `null` once the
/// last key had been removed.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecipients {
    Current(Vec<Recipient>),
    Legacy(Vec<String>),
}

pub(crate) fn load_recipients(tx: &Tx<'_>) -> Result<Vec<Recipient>> {
    let Some(raw) = tx.get(CONFIG_BUCKET, RECIPIENTS_KEY)? else {
        return Ok(Vec::new());
    };
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let recipients = match serde_json::from_slice::<Option<StoredRecipients>>(&raw)? {
        None => Vec::new(),
        Some(StoredRecipients::Current(recipients)) => recipients,
        Some(StoredRecipients::Legacy(keys)) => keys
            .into_iter()
            .map(|key| Recipient::new(default_alias(&key), key))
            .collect(),
    };
    Ok(recipients)
}

fn store_recipients(tx: &Tx<'_>, recipients: &[Recipient]) -> Result<()> {
    let raw = serde_json::to_vec(recipients)?;
    tx.put(CONFIG_BUCKET, RECIPIENTS_KEY, &raw)
}

/// Public keys of the registry as seen by `tx`.
pub(crate) fn resolve_in(tx: &Tx<'_>) -> Result<Vec<x25519::Recipient>> {
    load_recipients(tx)?
        .iter()
        .map(Recipient::public_key)
        .collect()
}

impl RecipientRegistry for Database {
    fn list_recipients(&self) -> Result<Vec<Recipient>> {
        self.kv().view(load_recipients)
    }

    fn add_recipient(&self, recipient: &Recipient) -> Result<()> {
        // Canonical form, so the same key always compares equal.
        let publickey = recipient.public_key()?.to_string();
        let alias = if recipient.alias.trim().is_empty() {
            default_alias(&publickey)
        } else {
            recipient.alias.trim().to_string()
        };

        self.kv().update(|tx| {
            let mut recipients = load_recipients(tx)?;

            if recipients.iter().any(|r| r.publickey == publickey) {
                tracing::debug!(alias = %alias, "recipient already registered");
                return Ok(());
            }

            match recipients.iter_mut().find(|r| r.alias == alias) {
                Some(existing) => {
                    tracing::info!(alias = %alias, "replacing public key of recipient");
                    existing.publickey = publickey;
                }
                None => {
                    tracing::info!(alias = %alias, "adding recipient");
                    recipients.push(Recipient::new(alias.clone(), publickey));
                }
            }

            store_recipients(tx, &recipients)
        })
    }

    fn remove_recipient_by_alias(&self, alias: &str) -> Result<()> {
        let alias = alias.trim();
        self.kv().update(|tx| {
            let mut recipients = load_recipients(tx)?;
            let position = recipients
                .iter()
                .position(|r| r.alias == alias)
                .ok_or_else(|| AenError::AliasNotFound(alias.to_string()))?;
            recipients.remove(position);

            if recipients.is_empty() {
                tracing::warn!(alias = %alias, "removed last recipient; new notes cannot be written");
            } else {
                tracing::info!(alias = %alias, "removed recipient");
            }
            store_recipients(tx, &recipients)
        })
    }

    fn resolve_recipients(&self) -> Result<Vec<x25519::Recipient>> {
        self.kv().view(resolve_in)
    }
}
