//! Error types for the Keywheel core.
//!
//! Strongly-typed errors per layer: storage errors (lineage manipulation)
//! and service errors (provisioning and key-batch reads). Every failure is
//! an explicit status value returned to the caller - nothing is swallowed
//! and nothing is retried internally.

use thiserror::Error;

use crate::registry::SecurityGroupId;

/// Errors from key lineage storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Seed or window parameters are malformed.
    #[error("invalid key storage configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the parameters.
        reason: String,
    },

    /// The key id space for this lineage is used up.
    ///
    /// Key ids must stay strictly increasing, so a lineage whose newest key
    /// is `u32::MAX` can no longer rotate. Fatal to the group's rotation
    /// cycle; must be surfaced to an operator.
    #[error("key id space exhausted at {newest}")]
    KeyIdExhausted {
        /// Newest key id in the lineage.
        newest: u32,
    },

    /// The storage holds no keys yet.
    #[error("key storage is not seeded")]
    NotSeeded,
}

/// Errors from the security keys service surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Group configuration rejected at provisioning.
    #[error("invalid security group configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// A group with this name is already registered.
    #[error("security group already exists: {group}")]
    AlreadyExists {
        /// The conflicting group id.
        group: SecurityGroupId,
    },

    /// No group registered under this id.
    #[error("unknown security group: {group}")]
    NotFound {
        /// The unresolved group id.
        group: SecurityGroupId,
    },

    /// The caller is not allowed to read this group's keys.
    #[error("access denied to security group: {group}")]
    AccessDenied {
        /// The protected group id.
        group: SecurityGroupId,
    },

    /// The service failed internally.
    ///
    /// Reserved for states that should be unreachable, such as a registered
    /// group whose lineage is empty.
    #[error("internal service failure: {reason}")]
    Internal {
        /// What went wrong.
        reason: String,
    },
}
