//! Client-side error types.

use keywheel_core::SecurityGroupId;
use keywheel_crypto::ProtectError;
use keywheel_proto::StatusCode;
use thiserror::Error;

use crate::transport::EndpointUrlError;

/// Errors returned synchronously by client operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SksClientError {
    /// The endpoint URL failed syntactic validation.
    ///
    /// Detected before any connection attempt; no transport I/O happens.
    #[error(transparent)]
    InvalidEndpointUrl(#[from] EndpointUrlError),

    /// `pull` was called before `configure`.
    #[error("client has no pull configuration")]
    NotConfigured,
}

/// Why a pull attempt ended in the terminal `Failed` state.
///
/// Surfaced through the completion channel; the client does not retry any
/// of these internally. The embedding loop may re-`configure` or keep
/// polling if it wants resilience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullFailure {
    /// The endpoint URL was malformed; no connection was attempted.
    InvalidEndpointUrl,
    /// The transport could not reach or keep the endpoint.
    ConnectionClosed,
    /// The channel or the service rejected the caller's identity.
    AccessDenied,
    /// The service answered with some other fault.
    ServiceFault(StatusCode),
}

impl std::fmt::Display for PullFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEndpointUrl => f.write_str("invalid endpoint url"),
            Self::ConnectionClosed => f.write_str("connection closed"),
            Self::AccessDenied => f.write_str("access denied"),
            Self::ServiceFault(status) => write!(f, "service fault: {status}"),
        }
    }
}

/// Errors from the group key binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The group has no usable current key yet.
    ///
    /// A group whose security mode requires protection must refuse to start
    /// in this state rather than produce unprotected or garbage traffic.
    #[error("keys not ready for group {group}")]
    KeysNotReady {
        /// The group that cannot start yet.
        group: SecurityGroupId,
    },

    /// The message names a key the mirror no longer (or never) retained.
    #[error("key {key_id} not retained for group {group}")]
    UnknownKeyId {
        /// The group whose mirror was consulted.
        group: SecurityGroupId,
        /// Key id the message was tagged with.
        key_id: u32,
    },

    /// The cryptographic open/seal operation failed.
    #[error(transparent)]
    Protect(#[from] ProtectError),
}
