//! Process-wide security group registry and its shared-lock wrapper.
//!
//! The registry maps group ids to their configuration and key storage. It
//! is plain mutable state; sharing across the rotation scheduler, the
//! server endpoint, and client install callbacks goes through
//! [`SharedRegistry`], one mutex scoped to this aggregate alone. Every
//! access is a scoped acquisition around a single read/modify/write - the
//! lock is never held across a network suspension point.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use keywheel_crypto::SECRET_SIZE;

use crate::{
    config::{Principal, SecurityGroupConfig},
    error::ServiceError,
    key_material::KeyMaterial,
    key_storage::{KeyBatch, KeyStorage},
};

/// Key id assigned to the first key of a freshly provisioned group.
const STARTING_KEY_ID: u32 = 1;

/// Identifier of a security group: its provisioned name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecurityGroupId(String);

impl SecurityGroupId {
    /// Wrap a group name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The group name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecurityGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One registered security group: its policy and its key lineage.
#[derive(Debug, Clone)]
pub struct SecurityGroup {
    config: SecurityGroupConfig,
    storage: KeyStorage,
}

impl SecurityGroup {
    /// Group policy.
    pub fn config(&self) -> &SecurityGroupConfig {
        &self.config
    }

    /// The group's key lineage.
    pub fn storage(&self) -> &KeyStorage {
        &self.storage
    }

    /// Mutable access to the lineage (rotation, mirror install).
    pub fn storage_mut(&mut self) -> &mut KeyStorage {
        &mut self.storage
    }
}

/// Process-wide mapping from security group id to its state.
///
/// The authoritative service registers groups through [`register`]
/// (validated and seeded); client processes materialize mirror entries
/// through [`install_mirror`] when the first pulled batch arrives.
///
/// [`register`]: SecurityGroupRegistry::register
/// [`install_mirror`]: SecurityGroupRegistry::install_mirror
#[derive(Debug, Default)]
pub struct SecurityGroupRegistry {
    groups: HashMap<SecurityGroupId, SecurityGroup>,
}

impl SecurityGroupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a security group: validate, register, and seed its lineage
    /// with one current key plus `max_future_key_count` future keys.
    ///
    /// `fresh_secret` supplies the entropy for each minted key.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if the configuration fails validation
    /// - `AlreadyExists` if a group with this name is registered
    pub fn register(
        &mut self,
        config: SecurityGroupConfig,
        mut fresh_secret: impl FnMut() -> [u8; SECRET_SIZE],
    ) -> Result<SecurityGroupId, ServiceError> {
        config.validate()?;

        let id = SecurityGroupId::new(config.name.clone());
        if self.groups.contains_key(&id) {
            return Err(ServiceError::AlreadyExists { group: id });
        }

        let mut storage = KeyStorage::new(config.max_past_key_count, config.max_future_key_count);
        let future_secrets: Vec<[u8; SECRET_SIZE]> =
            (0..config.max_future_key_count).map(|_| fresh_secret()).collect();
        storage
            .seed(KeyMaterial::generate(STARTING_KEY_ID, fresh_secret()), &future_secrets)
            .map_err(|err| ServiceError::InvalidConfig { reason: err.to_string() })?;

        tracing::info!(group = %id, lifetime = ?config.key_lifetime, "security group registered");
        self.groups.insert(id.clone(), SecurityGroup { config, storage });
        Ok(id)
    }

    /// Remove a group, dropping (and thereby zeroizing) its lineage.
    pub fn deregister(&mut self, id: &SecurityGroupId) -> Result<(), ServiceError> {
        self.groups
            .remove(id)
            .map(|_| tracing::info!(group = %id, "security group deregistered"))
            .ok_or_else(|| ServiceError::NotFound { group: id.clone() })
    }

    /// Look up a group. `None` if not registered.
    pub fn group(&self, id: &SecurityGroupId) -> Option<&SecurityGroup> {
        self.groups.get(id)
    }

    /// Mutable group lookup. `None` if not registered.
    pub fn group_mut(&mut self, id: &SecurityGroupId) -> Option<&mut SecurityGroup> {
        self.groups.get_mut(id)
    }

    /// Whether a group is registered.
    pub fn contains(&self, id: &SecurityGroupId) -> bool {
        self.groups.contains_key(id)
    }

    /// Ids of all registered groups.
    pub fn group_ids(&self) -> Vec<SecurityGroupId> {
        self.groups.keys().cloned().collect()
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no groups are registered.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Update the one mutable policy field: the required caller principal.
    pub fn update_authorized_principal(
        &mut self,
        id: &SecurityGroupId,
        principal: Option<Principal>,
    ) -> Result<(), ServiceError> {
        let group =
            self.groups.get_mut(id).ok_or_else(|| ServiceError::NotFound { group: id.clone() })?;
        group.config.authorized_principal = principal;
        Ok(())
    }

    /// Install a pulled batch into this process's mirror of a group.
    ///
    /// Creates the mirror entry on first install; replaces the lineage
    /// wholesale on every install. The policy URI and key lifetime adopt
    /// whatever the authoritative response carried.
    pub fn install_mirror(
        &mut self,
        id: &SecurityGroupId,
        security_policy_uri: String,
        key_lifetime: Duration,
        batch: KeyBatch,
    ) {
        let entry = self.groups.entry(id.clone()).or_insert_with(|| SecurityGroup {
            config: SecurityGroupConfig {
                name: id.as_str().to_string(),
                security_policy_uri: security_policy_uri.clone(),
                key_lifetime,
                max_past_key_count: batch.past.len() as u32,
                max_future_key_count: (batch.future.len() as u32).max(1),
                authorized_principal: None,
            },
            storage: KeyStorage::new(batch.past.len() as u32, (batch.future.len() as u32).max(1)),
        });

        entry.config.security_policy_uri = security_policy_uri;
        entry.config.key_lifetime = key_lifetime;
        entry.storage.install_batch(batch);
        tracing::debug!(group = %id, current = ?entry.storage.current().map(KeyMaterial::key_id),
            "mirror batch installed");
    }
}

/// Registry handle shared within one process.
///
/// Exactly one lock guards the registry/storage aggregate. Callers pass a
/// closure and the lock is released when the closure returns, which makes
/// holding it across an `.await` impossible by construction.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<SecurityGroupRegistry>>,
}

impl SharedRegistry {
    /// Create a handle around an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a read-only closure under the registry lock.
    pub fn with<R>(&self, f: impl FnOnce(&SecurityGroupRegistry) -> R) -> R {
        // Registry mutations never leave the map half-written, so the state
        // behind a poisoned lock is still consistent.
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Run a mutating closure under the registry lock.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut SecurityGroupRegistry) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Current key id of a group, if registered and seeded.
    ///
    /// Convenience for convergence checks and tests.
    pub fn current_key_id(&self, id: &SecurityGroupId) -> Option<u32> {
        self.with(|reg| {
            reg.group(id).and_then(|group| group.storage().current().map(KeyMaterial::key_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::POLICY_XCHACHA20_POLY1305;

    fn test_config(name: &str) -> SecurityGroupConfig {
        SecurityGroupConfig {
            name: name.to_string(),
            security_policy_uri: POLICY_XCHACHA20_POLY1305.to_string(),
            key_lifetime: Duration::from_millis(200),
            max_past_key_count: 1,
            max_future_key_count: 1,
            authorized_principal: None,
        }
    }

    fn counter_secrets() -> impl FnMut() -> [u8; SECRET_SIZE] {
        let mut counter = 0u8;
        move || {
            counter += 1;
            [counter; SECRET_SIZE]
        }
    }

    #[test]
    fn register_seeds_the_lineage() {
        let mut registry = SecurityGroupRegistry::new();

        let id = registry.register(test_config("GroupA"), counter_secrets()).unwrap();
        let group = registry.group(&id).unwrap();

        assert_eq!(group.storage().current().unwrap().key_id(), STARTING_KEY_ID);
        assert_eq!(group.storage().future_count(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = SecurityGroupRegistry::new();
        registry.register(test_config("GroupA"), counter_secrets()).unwrap();

        let result = registry.register(test_config("GroupA"), counter_secrets());
        assert!(matches!(result, Err(ServiceError::AlreadyExists { .. })));
    }

    #[test]
    fn invalid_config_is_rejected_before_registration() {
        let mut registry = SecurityGroupRegistry::new();
        let mut config = test_config("GroupA");
        config.key_lifetime = Duration::ZERO;

        let result = registry.register(config, counter_secrets());
        assert!(matches!(result, Err(ServiceError::InvalidConfig { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn deregister_unknown_group_fails() {
        let mut registry = SecurityGroupRegistry::new();

        let result = registry.deregister(&SecurityGroupId::new("missing"));
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[test]
    fn deregister_frees_the_group() {
        let mut registry = SecurityGroupRegistry::new();
        let id = registry.register(test_config("GroupA"), counter_secrets()).unwrap();

        registry.deregister(&id).unwrap();
        assert!(!registry.contains(&id));
    }

    #[test]
    fn update_authorized_principal() {
        let mut registry = SecurityGroupRegistry::new();
        let id = registry.register(test_config("GroupA"), counter_secrets()).unwrap();

        registry.update_authorized_principal(&id, Some(Principal::new("user1"))).unwrap();

        assert_eq!(
            registry.group(&id).unwrap().config().authorized_principal,
            Some(Principal::new("user1"))
        );
    }

    #[test]
    fn install_mirror_creates_and_replaces() {
        let mut authority = SecurityGroupRegistry::new();
        let id = authority.register(test_config("GroupA"), counter_secrets()).unwrap();
        let batch = authority.group(&id).unwrap().storage().read_batch(1, 1).unwrap();

        let mut mirror = SecurityGroupRegistry::new();
        mirror.install_mirror(
            &id,
            POLICY_XCHACHA20_POLY1305.to_string(),
            Duration::from_millis(200),
            batch,
        );

        let mirrored = mirror.group(&id).unwrap();
        assert_eq!(
            mirrored.storage().current().unwrap(),
            authority.group(&id).unwrap().storage().current().unwrap()
        );
    }

    #[test]
    fn shared_registry_round_trip() {
        let shared = SharedRegistry::new();

        let id = shared
            .with_mut(|reg| reg.register(test_config("GroupA"), counter_secrets()))
            .unwrap();

        assert_eq!(shared.current_key_id(&id), Some(STARTING_KEY_ID));
    }
}
