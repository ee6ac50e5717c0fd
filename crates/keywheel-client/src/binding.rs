//! Glue between a writer/reader group and its mirrored key lineage.

use keywheel_core::{KeyMaterial, SecurityGroupId, SharedRegistry};
use keywheel_crypto::{
    MESSAGE_NONCE_RANDOM_SIZE, ProtectedMessage, protect_message, unprotect_message,
};

use crate::error::BindingError;

/// Protection level a writer/reader group was configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    /// Traffic is neither signed nor encrypted.
    None,
    /// Traffic is signed.
    Sign,
    /// Traffic is signed and encrypted.
    SignAndEncrypt,
}

impl SecurityMode {
    /// Whether this mode needs key material before the group may start.
    pub fn requires_keys(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Binds one writer/reader group to its security group's mirrored lineage.
///
/// The binding turns operational on the first successful key install and is
/// the single gate a group's start-up path must pass before encoding or
/// decoding protected traffic.
#[derive(Debug, Clone)]
pub struct GroupKeyBinding {
    group_id: SecurityGroupId,
    registry: SharedRegistry,
    security_mode: SecurityMode,
    operational: bool,
}

impl GroupKeyBinding {
    /// Bind a group to this process's mirror registry.
    pub fn new(
        group_id: SecurityGroupId,
        registry: SharedRegistry,
        security_mode: SecurityMode,
    ) -> Self {
        Self { group_id, registry, security_mode, operational: false }
    }

    /// The bound security group.
    pub fn group_id(&self) -> &SecurityGroupId {
        &self.group_id
    }

    /// Configured protection level.
    pub fn security_mode(&self) -> SecurityMode {
        self.security_mode
    }

    /// Whether a key batch has been installed for this group.
    pub fn is_operational(&self) -> bool {
        self.operational
    }

    /// Mirror registry this binding reads keys from.
    pub(crate) fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Record a successful install. Called by the pull client only.
    pub(crate) fn keys_installed(&mut self) {
        self.operational = true;
    }

    /// Start-up gate: may this group begin producing/consuming traffic?
    ///
    /// # Errors
    ///
    /// `KeysNotReady` if the mode requires protection and no batch has been
    /// installed yet. A caller receiving this must not start the group.
    pub fn mark_operational(&self) -> Result<(), BindingError> {
        if self.security_mode.requires_keys() && !self.operational {
            return Err(BindingError::KeysNotReady { group: self.group_id.clone() });
        }
        Ok(())
    }

    /// Id of the mirror's current key, if any.
    pub fn current_key_id(&self) -> Option<u32> {
        self.registry.current_key_id(&self.group_id)
    }

    /// Protect an outgoing message under the mirror's current key.
    ///
    /// `random_suffix` feeds the message nonce; the caller provides it so
    /// the binding stays deterministic under test.
    pub fn protect(
        &self,
        plaintext: &[u8],
        random_suffix: [u8; MESSAGE_NONCE_RANDOM_SIZE],
    ) -> Result<ProtectedMessage, BindingError> {
        self.registry.with(|reg| {
            let current = reg
                .group(&self.group_id)
                .and_then(|group| group.storage().current())
                .ok_or_else(|| BindingError::KeysNotReady { group: self.group_id.clone() })?;

            Ok(protect_message(
                plaintext,
                current.key_id(),
                current.secret(),
                current.nonce(),
                random_suffix,
            ))
        })
    }

    /// Open an incoming message with whichever retained key it names.
    ///
    /// Messages protected under an older key keep decoding until that key
    /// is pruned from the mirror by a later install.
    pub fn unprotect(&self, message: &ProtectedMessage) -> Result<Vec<u8>, BindingError> {
        self.registry.with(|reg| {
            let key: &KeyMaterial = reg
                .group(&self.group_id)
                .and_then(|group| group.storage().key_by_id(message.key_id))
                .ok_or_else(|| BindingError::UnknownKeyId {
                    group: self.group_id.clone(),
                    key_id: message.key_id,
                })?;

            Ok(unprotect_message(message, key.key_id(), key.secret())?)
        })
    }
}

/// Start-up gate for a writer/reader group.
///
/// Succeeds only once the group's binding is operational (or its security
/// mode needs no keys); a group that fails this check must not start
/// producing or consuming encoded traffic.
pub fn set_group_operational(binding: &GroupKeyBinding) -> Result<(), BindingError> {
    binding.mark_operational()
}
