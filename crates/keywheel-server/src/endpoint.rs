//! Request handler for `GetSecurityKeys`.
//!
//! Each request runs the same linear machine: resolve the group, authorize
//! the caller, prepare the batch, respond - or short-circuit into an error
//! response. The handler holds the registry lock once per request for the
//! resolve/authorize/read sequence, so a batch is always read from a
//! consistent lineage (pre- or post-rotation, never mid-rotation).

use keywheel_core::{
    CallerIdentity, KeyAccessControl, KeyMaterial, SecurityGroupId, ServiceError, SharedRegistry,
};
use keywheel_proto::{
    GetSecurityKeysRequest, SecurityKeysResponse, ServiceFault, ServiceRequest, ServiceResponse,
    StatusCode, WireKeyMaterial,
};

/// Server-side handler answering key-batch requests.
///
/// Stateless between requests; cloning shares the underlying registry.
#[derive(Debug, Clone)]
pub struct SksServerEndpoint {
    registry: SharedRegistry,
}

impl SksServerEndpoint {
    /// Create an endpoint over the process's canonical registry.
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Handle a decoded service request from an authenticated channel.
    ///
    /// Failures come back as [`ServiceResponse::Fault`] with the matching
    /// status code; this function itself never fails.
    pub fn handle(&self, caller: &CallerIdentity, request: &ServiceRequest) -> ServiceResponse {
        match request {
            ServiceRequest::GetSecurityKeys(request) => {
                match self.get_security_keys(caller, request) {
                    Ok(response) => ServiceResponse::SecurityKeys(response),
                    Err(err) => ServiceResponse::Fault(ServiceFault {
                        status: status_for(&err),
                        message: err.to_string(),
                    }),
                }
            },
        }
    }

    /// Read a key batch for the caller.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group is not registered
    /// - `AccessDenied` if the caller fails the group's principal check
    pub fn get_security_keys(
        &self,
        caller: &CallerIdentity,
        request: &GetSecurityKeysRequest,
    ) -> Result<SecurityKeysResponse, ServiceError> {
        let id = SecurityGroupId::new(request.security_group_id.clone());

        self.registry.with(|reg| {
            let group =
                reg.group(&id).ok_or_else(|| ServiceError::NotFound { group: id.clone() })?;

            if !KeyAccessControl::authorize(caller, group.config()) {
                tracing::warn!(group = %id, ?caller, "key batch request denied");
                return Err(ServiceError::AccessDenied { group: id.clone() });
            }

            // The group's configured window bounds the response regardless
            // of how much the caller asked for.
            let config = group.config();
            let batch = group
                .storage()
                .read_batch(
                    request.requested_past_count.min(config.max_past_key_count),
                    request.requested_future_count.min(config.max_future_key_count),
                )
                .map_err(|err| ServiceError::Internal { reason: err.to_string() })?;

            tracing::debug!(
                group = %id,
                current = batch.current.key_id(),
                keys = batch.len(),
                "key batch prepared"
            );

            Ok(SecurityKeysResponse {
                security_policy_uri: config.security_policy_uri.clone(),
                key_lifetime: config.key_lifetime,
                past_keys: batch.past.iter().map(to_wire).collect(),
                current_key: to_wire(&batch.current),
                future_keys: batch.future.iter().map(to_wire).collect(),
            })
        })
    }
}

fn to_wire(key: &KeyMaterial) -> WireKeyMaterial {
    WireKeyMaterial { key_id: key.key_id(), secret: *key.secret().as_bytes() }
}

fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::InvalidConfig { .. } => StatusCode::BadInvalidArgument,
        ServiceError::AlreadyExists { .. } => StatusCode::BadAlreadyExists,
        ServiceError::NotFound { .. } => StatusCode::BadNotFound,
        ServiceError::AccessDenied { .. } => StatusCode::BadAccessDenied,
        ServiceError::Internal { .. } => StatusCode::BadInternal,
    }
}
