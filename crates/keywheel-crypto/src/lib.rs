//! Keywheel Cryptographic Primitives
//!
//! Cryptographic building blocks for the security keys service. Pure
//! functions with deterministic outputs. Callers provide random bytes for
//! deterministic testing.
//!
//! # Key Lifecycle
//!
//! Each security group owns a lineage of symmetric keys. A key is born from
//! 32 caller-provided random bytes; its nonce material is derived from the
//! secret with HKDF-SHA256 so the two can never drift apart. The key then
//! protects group traffic with XChaCha20-Poly1305 until rotation prunes it.
//!
//! ```text
//! Random Secret (32 bytes, from the Environment RNG)
//!        │
//!        ▼
//! HKDF → Nonce Material (per key)
//!        │
//!        ▼
//! AEAD Protection → Protected Message (tagged with the key id)
//! ```
//!
//! # Security
//!
//! - Secrets are zeroized on drop
//! - The message nonce binds the ciphertext to its key id, so a message can
//!   only be opened by the exact lineage member that produced it
//! - Failed authentication tag -> reject message

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod material;
mod protect;

pub use material::{KeySecret, NONCE_MATERIAL_SIZE, SECRET_SIZE, derive_nonce_material};
pub use protect::{
    MESSAGE_NONCE_RANDOM_SIZE, ProtectError, ProtectedMessage, protect_message, unprotect_message,
};
