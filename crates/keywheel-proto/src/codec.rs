//! CBOR encoding for service payloads.

use thiserror::Error;

use crate::payloads::{ServiceRequest, ServiceResponse};

/// Errors from payload encoding/decoding.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A payload failed to serialize.
    #[error("payload encoding failed: {0}")]
    Encode(String),

    /// Received bytes are not a valid payload.
    #[error("payload decoding failed: {0}")]
    Decode(String),
}

/// Encode a service request to CBOR bytes.
pub fn encode_request(request: &ServiceRequest) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(request, &mut bytes)
        .map_err(|err| ProtocolError::Encode(err.to_string()))?;
    Ok(bytes)
}

/// Decode a service request from CBOR bytes.
pub fn decode_request(bytes: &[u8]) -> Result<ServiceRequest, ProtocolError> {
    ciborium::from_reader(bytes).map_err(|err| ProtocolError::Decode(err.to_string()))
}

/// Encode a service response to CBOR bytes.
pub fn encode_response(response: &ServiceResponse) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(response, &mut bytes)
        .map_err(|err| ProtocolError::Encode(err.to_string()))?;
    Ok(bytes)
}

/// Decode a service response from CBOR bytes.
pub fn decode_response(bytes: &[u8]) -> Result<ServiceResponse, ProtocolError> {
    ciborium::from_reader(bytes).map_err(|err| ProtocolError::Decode(err.to_string()))
}
