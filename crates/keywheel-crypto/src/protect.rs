//! Message protection using `XChaCha20-Poly1305`.
//!
//! All functions are pure - random bytes must be provided by the caller.
//! This enables deterministic testing and keeps the crate free of I/O.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use thiserror::Error;

use crate::material::{KeySecret, NONCE_MATERIAL_SIZE};

/// Size of the random suffix in the message nonce (8 bytes).
pub const MESSAGE_NONCE_RANDOM_SIZE: usize = 8;

/// Poly1305 tag size (16 bytes).
const POLY1305_TAG_SIZE: usize = 16;

/// Errors from the protect/unprotect path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtectError {
    /// The message was protected under a different key id.
    #[error("key id mismatch: message is tagged {actual}, key is {expected}")]
    KeyIdMismatch {
        /// Key id of the key handed to `unprotect_message`.
        expected: u32,
        /// Key id the message is tagged with.
        actual: u32,
    },

    /// Authentication tag verification failed (tampering or wrong key).
    #[error("authentication failed")]
    AuthenticationFailed,
}

/// A protected group message with the metadata needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedMessage {
    /// Id of the lineage key that protected this message.
    pub key_id: u32,
    /// The 24-byte `XChaCha20` nonce.
    pub nonce: [u8; 24],
    /// The ciphertext including 16-byte Poly1305 tag.
    pub ciphertext: Vec<u8>,
}

impl ProtectedMessage {
    /// Plaintext length (ciphertext length minus authentication tag).
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(POLY1305_TAG_SIZE)
    }
}

/// Protect a message under a group key.
///
/// # Security
///
/// - The nonce is unique per (key id, nonce material, random suffix)
/// - The key id in the nonce binds the ciphertext to one lineage member
/// - Caller MUST provide cryptographically secure random bytes in production
pub fn protect_message(
    plaintext: &[u8],
    key_id: u32,
    secret: &KeySecret,
    nonce_material: &[u8; NONCE_MATERIAL_SIZE],
    random_suffix: [u8; MESSAGE_NONCE_RANDOM_SIZE],
) -> ProtectedMessage {
    let nonce = build_nonce(key_id, nonce_material, random_suffix);
    let cipher = XChaCha20Poly1305::new(secret.as_bytes().into());

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(&nonce), plaintext) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    ProtectedMessage { key_id, nonce, ciphertext }
}

/// Open a protected message with a group key.
///
/// # Errors
///
/// - `KeyIdMismatch` if the message is tagged with a different key id
/// - `AuthenticationFailed` if the tag or key is incorrect (tamper)
pub fn unprotect_message(
    message: &ProtectedMessage,
    key_id: u32,
    secret: &KeySecret,
) -> Result<Vec<u8>, ProtectError> {
    if message.key_id != key_id {
        return Err(ProtectError::KeyIdMismatch { expected: key_id, actual: message.key_id });
    }

    let cipher = XChaCha20Poly1305::new(secret.as_bytes().into());
    let nonce = XNonce::from_slice(&message.nonce);

    cipher
        .decrypt(nonce, message.ciphertext.as_slice())
        .map_err(|_| ProtectError::AuthenticationFailed)
}

/// Build a 24-byte nonce for `XChaCha20`.
///
/// Structure:
/// - bytes 0-3: key id (big-endian)
/// - bytes 4-15: first 12 bytes of the key's nonce material
/// - bytes 16-23: random suffix (caller-provided)
fn build_nonce(
    key_id: u32,
    nonce_material: &[u8; NONCE_MATERIAL_SIZE],
    random_suffix: [u8; MESSAGE_NONCE_RANDOM_SIZE],
) -> [u8; 24] {
    let mut nonce = [0u8; 24];

    nonce[0..4].copy_from_slice(&key_id.to_be_bytes());
    nonce[4..16].copy_from_slice(&nonce_material[0..12]);
    nonce[16..24].copy_from_slice(&random_suffix);

    nonce
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{SECRET_SIZE, derive_nonce_material};

    fn test_key(fill: u8) -> (KeySecret, [u8; NONCE_MATERIAL_SIZE]) {
        let secret = KeySecret::from_bytes([fill; SECRET_SIZE]);
        let material = derive_nonce_material(&secret);
        (secret, material)
    }

    #[test]
    fn protect_unprotect_roundtrip() {
        let (secret, material) = test_key(0x11);
        let plaintext = b"published payload";

        let protected =
            protect_message(plaintext, 7, &secret, &material, [0xAB; MESSAGE_NONCE_RANDOM_SIZE]);
        let opened = unprotect_message(&protected, 7, &secret).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn empty_message_roundtrip() {
        let (secret, material) = test_key(0x22);

        let protected =
            protect_message(b"", 1, &secret, &material, [0x00; MESSAGE_NONCE_RANDOM_SIZE]);
        let opened = unprotect_message(&protected, 1, &secret).unwrap();

        assert_eq!(opened, b"");
    }

    #[test]
    fn ciphertext_carries_tag_overhead() {
        let (secret, material) = test_key(0x33);
        let plaintext = b"sample";

        let protected =
            protect_message(plaintext, 1, &secret, &material, [0x00; MESSAGE_NONCE_RANDOM_SIZE]);

        assert_eq!(protected.ciphertext.len(), plaintext.len() + POLY1305_TAG_SIZE);
        assert_eq!(protected.plaintext_len(), plaintext.len());
    }

    #[test]
    fn wrong_key_id_is_rejected_before_decryption() {
        let (secret, material) = test_key(0x44);

        let protected =
            protect_message(b"msg", 5, &secret, &material, [0x00; MESSAGE_NONCE_RANDOM_SIZE]);
        let result = unprotect_message(&protected, 6, &secret);

        assert_eq!(result, Err(ProtectError::KeyIdMismatch { expected: 6, actual: 5 }));
    }

    #[test]
    fn wrong_secret_fails_authentication() {
        let (secret, material) = test_key(0x55);
        let (wrong_secret, _) = test_key(0x66);

        let protected =
            protect_message(b"msg", 5, &secret, &material, [0x00; MESSAGE_NONCE_RANDOM_SIZE]);
        let result = unprotect_message(&protected, 5, &wrong_secret);

        assert_eq!(result, Err(ProtectError::AuthenticationFailed));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let (secret, material) = test_key(0x77);

        let mut protected =
            protect_message(b"msg", 5, &secret, &material, [0x00; MESSAGE_NONCE_RANDOM_SIZE]);
        protected.ciphertext[0] ^= 0xFF;

        let result = unprotect_message(&protected, 5, &secret);
        assert_eq!(result, Err(ProtectError::AuthenticationFailed));
    }

    #[test]
    fn different_random_suffix_produces_different_nonces() {
        let (secret, material) = test_key(0x88);

        let first =
            protect_message(b"msg", 5, &secret, &material, [0x00; MESSAGE_NONCE_RANDOM_SIZE]);
        let second =
            protect_message(b"msg", 5, &secret, &material, [0xFF; MESSAGE_NONCE_RANDOM_SIZE]);

        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn nonce_structure() {
        let (secret, material) = test_key(0x99);
        let nonce = build_nonce(0x0102_0304, &material, [0xAB; MESSAGE_NONCE_RANDOM_SIZE]);

        assert_eq!(&nonce[0..4], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&nonce[4..16], &material[0..12]);
        assert_eq!(&nonce[16..24], &[0xAB; 8]);
        drop(secret);
    }

    proptest::proptest! {
        #[test]
        fn roundtrip_for_arbitrary_payloads(
            payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..512),
            key_id in proptest::prelude::any::<u32>(),
            fill in proptest::prelude::any::<u8>(),
        ) {
            let (secret, material) = test_key(fill);
            let protected = protect_message(
                &payload, key_id, &secret, &material, [0x42; MESSAGE_NONCE_RANDOM_SIZE],
            );
            let opened = unprotect_message(&protected, key_id, &secret).unwrap();
            proptest::prop_assert_eq!(opened, payload);
        }
    }
}
