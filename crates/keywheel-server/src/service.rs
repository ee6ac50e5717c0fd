//! Provisioning surface of the security keys service.

use keywheel_core::{
    Principal, RotationScheduler, SecurityGroupConfig, SecurityGroupId, ServiceError,
    SharedRegistry, env::Environment,
};

use crate::endpoint::SksServerEndpoint;

/// The authoritative key service of one process.
///
/// Owns the canonical registry and mints the other two faces over it: the
/// request [`endpoint`](Self::endpoint) and the
/// [`rotation scheduler`](Self::rotation_scheduler) the embedding event
/// loop drives.
pub struct SecurityKeyService<E: Environment> {
    env: E,
    registry: SharedRegistry,
}

impl<E: Environment> SecurityKeyService<E> {
    /// Create a service with an empty registry.
    pub fn new(env: E) -> Self {
        Self { env, registry: SharedRegistry::new() }
    }

    /// Handle to the canonical registry.
    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    /// The request handler answering `GetSecurityKeys`.
    pub fn endpoint(&self) -> SksServerEndpoint {
        SksServerEndpoint::new(self.registry.clone())
    }

    /// A rotation scheduler over this service's groups.
    ///
    /// The caller owns it and ticks it from the event loop.
    pub fn rotation_scheduler(&self) -> RotationScheduler<E> {
        RotationScheduler::new(self.env.clone(), self.registry.clone())
    }

    /// Provision a security group: validate the configuration, register the
    /// group, and seed its lineage from environment entropy.
    pub fn add_security_group(
        &self,
        config: SecurityGroupConfig,
    ) -> Result<SecurityGroupId, ServiceError> {
        let env = &self.env;
        self.registry.with_mut(|reg| reg.register(config, || env.fresh_secret()))
    }

    /// Tear a group down, dropping its lineage.
    pub fn remove_security_group(&self, id: &SecurityGroupId) -> Result<(), ServiceError> {
        self.registry.with_mut(|reg| reg.deregister(id))
    }

    /// Operator update of a group's required caller principal.
    pub fn update_authorized_principal(
        &self,
        id: &SecurityGroupId,
        principal: Option<Principal>,
    ) -> Result<(), ServiceError> {
        self.registry.with_mut(|reg| reg.update_authorized_principal(id, principal))
    }
}
