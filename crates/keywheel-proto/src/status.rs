//! Status codes for service faults.

use serde::{Deserialize, Serialize};

/// Outcome classification carried in a [`ServiceFault`].
///
/// Mirrors the error taxonomy of the service surface so a client can
/// distinguish a missing group from a rejected identity without parsing
/// fault text.
///
/// [`ServiceFault`]: crate::ServiceFault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    /// Request completed.
    Good,
    /// The requested security group is not registered.
    BadNotFound,
    /// The caller's identity is not authorized for this group.
    BadAccessDenied,
    /// The request carried malformed arguments.
    BadInvalidArgument,
    /// A group with the requested name already exists.
    BadAlreadyExists,
    /// The service failed internally.
    BadInternal,
}

impl StatusCode {
    /// Whether this code reports a failure.
    pub fn is_bad(self) -> bool {
        !matches!(self, Self::Good)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Good => "Good",
            Self::BadNotFound => "BadNotFound",
            Self::BadAccessDenied => "BadAccessDenied",
            Self::BadInvalidArgument => "BadInvalidArgument",
            Self::BadAlreadyExists => "BadAlreadyExists",
            Self::BadInternal => "BadInternal",
        };
        f.write_str(name)
    }
}
