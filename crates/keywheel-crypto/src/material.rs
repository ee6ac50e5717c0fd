//! Key secrets and derived nonce material.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

/// Size of a group key secret in bytes.
pub const SECRET_SIZE: usize = 32;

/// Size of the nonce material derived from each secret.
pub const NONCE_MATERIAL_SIZE: usize = 32;

/// Label for nonce-material derivation (domain separation).
const NONCE_LABEL: &[u8] = b"keywheelNonceV1";

/// A symmetric group key secret.
///
/// Immutable once created. The secret is zeroized when the value is
/// dropped, so pruning a key from a lineage destroys its material.
#[derive(Clone, PartialEq, Eq)]
pub struct KeySecret {
    bytes: [u8; SECRET_SIZE],
}

impl KeySecret {
    /// Wrap caller-provided random bytes as a key secret.
    ///
    /// The caller MUST provide cryptographically secure random bytes in
    /// production; tests may pass fixed patterns.
    pub fn from_bytes(bytes: [u8; SECRET_SIZE]) -> Self {
        Self { bytes }
    }

    /// Raw secret bytes, used as the AEAD key.
    pub fn as_bytes(&self) -> &[u8; SECRET_SIZE] {
        &self.bytes
    }
}

impl Drop for KeySecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

// Never print key material, even at trace level.
impl std::fmt::Debug for KeySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeySecret(..)")
    }
}

/// Derive the nonce material for a key secret.
///
/// Deterministic: the same secret always yields the same nonce material,
/// so both sides of a key pull re-derive it locally instead of shipping it.
pub fn derive_nonce_material(secret: &KeySecret) -> [u8; NONCE_MATERIAL_SIZE] {
    let hkdf = Hkdf::<Sha256>::new(None, secret.as_bytes());

    let mut material = [0u8; NONCE_MATERIAL_SIZE];
    let Ok(()) = hkdf.expand(NONCE_LABEL, &mut material) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    material
}
