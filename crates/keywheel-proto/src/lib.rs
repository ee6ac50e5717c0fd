//! Keywheel key-pull protocol payloads.
//!
//! CBOR-encoded request/response messages exchanged over an established
//! secure channel. The channel itself (framing, encryption, identity
//! negotiation) is a collaborator outside this crate; these types only
//! describe the method-call surface of the security keys service.
//!
//! We chose CBOR because it's self-describing, compact, and needs no code
//! generation - the same reasoning the rest of the stack applies to its
//! storage payloads.
//!
//! # Invariants
//!
//! - Round-trip encoding must produce identical values
//! - Key secrets appear on the wire only inside an already-encrypted
//!   channel; this crate never logs or prints them

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod codec;
mod payloads;
mod status;

pub use codec::{ProtocolError, decode_request, decode_response, encode_request, encode_response};
pub use payloads::{
    GetSecurityKeysRequest, SecurityKeysResponse, ServiceFault, ServiceRequest, ServiceResponse,
    WIRE_SECRET_SIZE, WireKeyMaterial,
};
pub use status::StatusCode;
