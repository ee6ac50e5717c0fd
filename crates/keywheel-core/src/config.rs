//! Security group configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Policy URI for the XChaCha20-Poly1305 protection suite implemented by
/// `keywheel-crypto`.
pub const POLICY_XCHACHA20_POLY1305: &str =
    "urn:keywheel:securitypolicy:xchacha20poly1305-v1";

/// An authenticated caller identity, as established by the secure channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Wrap a principal name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The principal name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operator-provided configuration for one security group.
///
/// Created once at group setup and immutable thereafter, except
/// `authorized_principal` which an operator may update through the
/// registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupConfig {
    /// Group name; doubles as the group id under which clients pull keys.
    pub name: String,
    /// URI of the protection suite writer/reader groups must apply.
    pub security_policy_uri: String,
    /// How long a key remains current before rotation.
    pub key_lifetime: Duration,
    /// Bound on keys retained strictly before current.
    pub max_past_key_count: u32,
    /// Bound on keys generated strictly after current.
    pub max_future_key_count: u32,
    /// Required caller principal; `None` admits any authenticated caller.
    pub authorized_principal: Option<Principal>,
}

impl SecurityGroupConfig {
    /// Validate the configuration at provisioning time.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the offending parameter. Detected before any
    /// registry state is touched, so a rejected config is fatal to that
    /// call only.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.is_empty() {
            return Err(ServiceError::InvalidConfig {
                reason: "security group name must not be empty".to_string(),
            });
        }
        if self.security_policy_uri.is_empty() {
            return Err(ServiceError::InvalidConfig {
                reason: "security policy URI must not be empty".to_string(),
            });
        }
        if self.key_lifetime.is_zero() {
            return Err(ServiceError::InvalidConfig {
                reason: "key lifetime must be non-zero".to_string(),
            });
        }
        // Rotation advances onto a future key, so the window must admit one.
        if self.max_future_key_count == 0 {
            return Err(ServiceError::InvalidConfig {
                reason: "max future key count must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
