//! A single element of a security group's key lineage.

use keywheel_crypto::{KeySecret, NONCE_MATERIAL_SIZE, SECRET_SIZE, derive_nonce_material};

/// One immutable symmetric key: numeric id, secret, and derived nonce
/// material.
///
/// Key ids are strictly increasing within a lineage, starting at an
/// arbitrary base. A `KeyMaterial` is created by provisioning or rotation,
/// never mutated, and destroyed only when pruning drops it off the past
/// window (the secret zeroizes itself on drop).
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    key_id: u32,
    secret: KeySecret,
    nonce: [u8; NONCE_MATERIAL_SIZE],
}

impl KeyMaterial {
    /// Mint a key from raw random bytes, deriving its nonce material.
    pub fn generate(key_id: u32, secret_bytes: [u8; SECRET_SIZE]) -> Self {
        Self::from_secret(key_id, KeySecret::from_bytes(secret_bytes))
    }

    /// Build a key around an existing secret, deriving its nonce material.
    ///
    /// Used when installing a pulled batch: the wire carries only the
    /// secret, and both sides derive identical nonce material from it.
    pub fn from_secret(key_id: u32, secret: KeySecret) -> Self {
        let nonce = derive_nonce_material(&secret);
        Self { key_id, secret, nonce }
    }

    /// Numeric id of this key within its lineage.
    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    /// The symmetric secret.
    pub fn secret(&self) -> &KeySecret {
        &self.secret
    }

    /// Nonce material derived from the secret.
    pub fn nonce(&self) -> &[u8; NONCE_MATERIAL_SIZE] {
        &self.nonce
    }
}

// Key ids are safe to log; secrets and nonce material are not.
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial").field("key_id", &self.key_id).finish_non_exhaustive()
    }
}
