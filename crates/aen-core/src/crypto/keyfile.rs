//! Private key files.
//!
//! A key file holds one `AGE-SECRET-KEY-1...` string, usually followed by a
//! newline. Anything that is not an ASCII letter, digit or hyphen is stripped
//! before parsing, so stray whitespace or carriage returns do not matter.

use std::fs;
use std::path::Path;

use age::secrecy::ExposeSecret;
use age::x25519;
use zeroize::Zeroizing;

use crate::error::{AenError, Result};

/// Load the identity stored in `path`.
///
/// # Errors
///
/// - `AenError::NotFound` if the file does not exist
/// - `AenError::Crypto` if the content is not an age X25519 identity
pub fn identity_from_keyfile(path: &Path) -> Result<x25519::Identity> {
    if !path.exists() {
        return Err(AenError::NotFound(format!(
            "key file {} not available",
            path.display()
        )));
    }

    let raw = Zeroizing::new(fs::read_to_string(path)?);
    parse_identity(&raw)
}

/// Parse an identity from key file contents.
pub fn parse_identity(contents: &str) -> Result<x25519::Identity> {
    let stripped: Zeroizing<String> = Zeroizing::new(
        contents
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect(),
    );

    stripped
        .parse::<x25519::Identity>()
        .map_err(|e| AenError::Crypto(format!("Invalid private key: {}", e)))
}

/// Load the identity in `path`, generating and writing a new one if the file
/// does not exist yet.
pub fn ensure_key(path: &Path) -> Result<x25519::Identity> {
    if path.exists() {
        return identity_from_keyfile(path);
    }

    let identity = x25519::Identity::generate();
    let secret = identity.to_string();
    let contents = Zeroizing::new(format!("{}\n", secret.expose_secret()));
    crate::fs::write_atomic(path, contents.as_bytes(), true)?;

    tracing::info!(path = %path.display(), "written new key file");
    Ok(identity)
}

/// Short alias derived from a public key, used when none is given.
///
/// CRC-32 (IEEE) of the key string as unpadded lowercase hex, so existing
/// notebooks get the same aliases they always had.
pub fn default_alias(public_key: &str) -> String {
    format!("{:x}", crc32fast::hash(public_key.as_bytes()))
}
