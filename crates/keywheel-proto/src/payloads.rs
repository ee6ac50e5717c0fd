//! Request and response payload types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::status::StatusCode;

/// Size of a key secret on the wire.
pub const WIRE_SECRET_SIZE: usize = 32;

/// One key on the wire: its id and raw secret.
///
/// Nonce material is deliberately absent - both ends derive it from the
/// secret, so the two can never disagree.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireKeyMaterial {
    /// Key id within the group's lineage.
    pub key_id: u32,
    /// Raw symmetric secret.
    pub secret: [u8; WIRE_SECRET_SIZE],
}

// Secrets must never reach logs through a stray `{:?}`.
impl std::fmt::Debug for WireKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireKeyMaterial").field("key_id", &self.key_id).finish_non_exhaustive()
    }
}

/// Request for a security group's current key batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSecurityKeysRequest {
    /// Name of the security group to read.
    pub security_group_id: String,
    /// How many past keys the caller wants (clamped server-side).
    pub requested_past_count: u32,
    /// How many future keys the caller wants (clamped server-side).
    pub requested_future_count: u32,
}

/// Successful key-batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityKeysResponse {
    /// Protection suite the group's traffic must use.
    pub security_policy_uri: String,
    /// Rotation interval; the client schedules its next poll from this.
    pub key_lifetime: Duration,
    /// Keys strictly before current, ascending by id.
    pub past_keys: Vec<WireKeyMaterial>,
    /// The key presently in active use.
    pub current_key: WireKeyMaterial,
    /// Keys strictly after current, ascending by id.
    pub future_keys: Vec<WireKeyMaterial>,
}

/// Failure response with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFault {
    /// Machine-readable failure class.
    pub status: StatusCode,
    /// Human-readable context for operators.
    pub message: String,
}

/// All requests a client may issue over an established channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceRequest {
    /// Read a group's key batch.
    GetSecurityKeys(GetSecurityKeysRequest),
}

/// All responses the service produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceResponse {
    /// The requested key batch.
    SecurityKeys(SecurityKeysResponse),
    /// The request was rejected or failed.
    Fault(ServiceFault),
}

impl ServiceResponse {
    /// Status classification of this response.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SecurityKeys(_) => StatusCode::Good,
            Self::Fault(fault) => fault.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_status_classification() {
        let fault = ServiceResponse::Fault(ServiceFault {
            status: StatusCode::BadAccessDenied,
            message: "identity rejected".to_string(),
        });

        assert_eq!(fault.status(), StatusCode::BadAccessDenied);
    }

    #[test]
    fn wire_key_debug_redacts_the_secret() {
        let key = WireKeyMaterial { key_id: 4, secret: [0xCD; WIRE_SECRET_SIZE] };
        let rendered = format!("{key:?}");

        assert!(rendered.contains("key_id: 4"));
        assert!(!rendered.contains("CD"));
        assert!(!rendered.contains("205")); // 0xCD decimal
    }
}
