//! Age envelope encryption for note bodies and attachments.
//!
//! Each payload (a note body, a file note's content, one attachment) is sealed
//! into its own age envelope for every recipient public key, then base64
//! encoded so it can live inside a JSON record. Any one matching identity
//! opens it.

use std::io::{Read, Write};
use std::iter;

use age::x25519;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AenError, Result};

/// Encrypt `plaintext` for all `recipients` and return the base64 envelope.
///
/// # Errors
///
/// Returns `AenError::NoRecipients` when `recipients` is empty, since nobody
/// could ever open the result.
///
/// # Examples
///
/// ```
/// use age::x25519::Identity;
/// use aen_core::crypto::envelope::{decrypt, encrypt};
///
/// let identity = Identity::generate();
/// let sealed = encrypt(b"hello", &[identity.to_public()]).unwrap();
/// assert_eq!(decrypt(&sealed, &identity).unwrap(), b"hello");
/// ```
pub fn encrypt(plaintext: &[u8], recipients: &[x25519::Recipient]) -> Result<String> {
    if recipients.is_empty() {
        return Err(AenError::NoRecipients);
    }

    let encryptor =
        age::Encryptor::with_recipients(recipients.iter().map(|r| r as &dyn age::Recipient))
            .map_err(|e| AenError::Crypto(format!("Failed to create encryptor: {}", e)))?;

    let mut encrypted = Vec::new();
    let mut writer = encryptor
        .wrap_output(&mut encrypted)
        .map_err(|e| AenError::Crypto(format!("Failed to create encryptor: {}", e)))?;

    writer
        .write_all(plaintext)
        .map_err(|e| AenError::Crypto(format!("Encryption write failed: {}", e)))?;

    writer
        .finish()
        .map_err(|e| AenError::Crypto(format!("Encryption finish failed: {}", e)))?;

    Ok(STANDARD.encode(encrypted))
}

/// Decrypt a base64 envelope with a single identity.
///
/// # Errors
///
/// Returns `AenError::Decryption` if:
/// - The envelope is not valid base64
/// - The age header is malformed or truncated
/// - The identity is not one of the recipients
/// - The payload was tampered with
pub fn decrypt(ciphertext_b64: &str, identity: &x25519::Identity) -> Result<Vec<u8>> {
    let encrypted = STANDARD
        .decode(ciphertext_b64.trim())
        .map_err(|e| AenError::Decryption(format!("Invalid base64 envelope: {}", e)))?;

    let decryptor = age::Decryptor::new(encrypted.as_slice())
        .map_err(|e| AenError::Decryption(format!("Invalid age envelope: {}", e)))?;

    let mut reader = decryptor
        .decrypt(iter::once(identity as &dyn age::Identity))
        .map_err(|e| match e {
            age::DecryptError::NoMatchingKeys => {
                AenError::Decryption("identity is not a recipient of this envelope".to_string())
            }
            _ => AenError::Decryption(e.to_string()),
        })?;

    let mut decrypted = Vec::new();
    reader
        .read_to_end(&mut decrypted)
        .map_err(|e| AenError::Decryption(format!("Failed to read decrypted data: {}", e)))?;

    Ok(decrypted)
}

/// Parse an `age1...` public key.
pub fn parse_recipient(public_key: &str) -> Result<x25519::Recipient> {
    public_key
        .trim()
        .parse::<x25519::Recipient>()
        .map_err(|e| AenError::InvalidInput(format!("Invalid public key {:?}: {}", public_key, e)))
}

/// Public key string belonging to `identity`.
pub fn recipient_of(identity: &x25519::Identity) -> String {
    identity.to_public().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use age::x25519::Identity;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let identity = Identity::generate();
        let plaintext = b"Hello, World! This is secret data.";

        let sealed = encrypt(plaintext, &[identity.to_public()]).unwrap();
        let opened = decrypt(&sealed, &identity).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_every_recipient_can_decrypt() {
        let first = Identity::generate();
        let second = Identity::generate();
        let third = Identity::generate();
        let recipients = vec![first.to_public(), second.to_public(), third.to_public()];

        let sealed = encrypt(b"shared", &recipients).unwrap();

        for identity in [&first, &second, &third] {
            assert_eq!(decrypt(&sealed, identity).unwrap(), b"shared");
        }
    }

    #[test]
    fn test_stranger_cannot_decrypt() {
        let owner = Identity::generate();
        let stranger = Identity::generate();

        let sealed = encrypt(b"secret", &[owner.to_public()]).unwrap();
        let result = decrypt(&sealed, &stranger);

        assert!(matches!(result, Err(AenError::Decryption(_))));
    }

    #[test]
    fn test_no_recipients_rejected() {
        let result = encrypt(b"nobody", &[]);
        assert!(matches!(result, Err(AenError::NoRecipients)));
    }

    #[test]
    fn test_malformed_base64_fails() {
        let identity = Identity::generate();
        let result = decrypt("not base64 at all!!", &identity);
        assert!(matches!(result, Err(AenError::Decryption(_))));
    }

    #[test]
    fn test_malformed_envelope_fails() {
        let identity = Identity::generate();
        let garbage = STANDARD.encode(b"age-encryption.org/v1\ngarbage");
        let result = decrypt(&garbage, &identity);
        assert!(matches!(result, Err(AenError::Decryption(_))));
    }

    #[test]
    fn test_ciphertext_hides_plaintext() {
        let identity = Identity::generate();
        let sealed = encrypt(b"PLAINTEXT_MARKER_123", &[identity.to_public()]).unwrap();
        let raw = STANDARD.decode(&sealed).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("PLAINTEXT_MARKER_123"));
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let identity = Identity::generate();
        let sealed = encrypt(b"", &[identity.to_public()]).unwrap();
        assert!(decrypt(&sealed, &identity).unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_across_payload_sizes() {
        let identity = Identity::generate();
        let recipients = [identity.to_public()];

        // age streams in 64 KiB chunks.
        for size in [1, 15, 16, 255, 4096, 65_535, 65_536, 65_537, 200_000] {
            let plaintext: Vec<u8> = (0..size).map(|i| (i * 31 % 251) as u8).collect();

            let sealed = encrypt(&plaintext, &recipients).unwrap();
            let opened = decrypt(&sealed, &identity).unwrap();

            assert_eq!(opened.len(), size, "size {}", size);
            assert_eq!(opened, plaintext, "size {}", size);
        }
    }

    #[test]
    fn test_parse_recipient() {
        let identity = Identity::generate();
        let key = recipient_of(&identity);

        let parsed = parse_recipient(&key).unwrap();
        assert_eq!(parsed.to_string(), key);

        assert!(matches!(
            parse_recipient("age1notakey"),
            Err(AenError::InvalidInput(_))
        ));
    }
}
