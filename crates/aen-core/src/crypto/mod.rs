//! Cryptographic operations for aen.
//!
//! Built on **age** (https://age-encryption.org/) with X25519 recipients:
//! every note body and every attachment is its own envelope, readable by any
//! identity whose public key was in the recipient list at write time.
//!
//! ## Threat Model
//!
//! We defend against:
//! - Theft of the database file
//!
//! We do NOT defend against:
//! - Compromised OS / keylogger
//! - Removed recipients opening notes sealed while they were still listed
//! - Recovery of deleted records from free database pages

pub mod envelope;
pub mod keyfile;

pub use envelope::{decrypt, encrypt, parse_recipient, recipient_of};
pub use keyfile::{default_alias, ensure_key, identity_from_keyfile};
