//! Keywheel authoritative security keys service.
//!
//! The server side of the key-pull protocol: a provisioning surface that
//! registers and seeds security groups ([`SecurityKeyService`]) and a
//! request handler that answers `GetSecurityKeys` calls
//! ([`SksServerEndpoint`]). Both share one [`SharedRegistry`] with the
//! rotation scheduler driven by the embedding event loop.
//!
//! Transport is a collaborator: an established secure channel hands the
//! endpoint a decoded request plus the caller identity it authenticated,
//! and ships the response back. The endpoint itself never performs I/O and
//! never mutates key storage.
//!
//! [`SharedRegistry`]: keywheel_core::SharedRegistry

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod endpoint;
mod service;
mod system_env;

pub use endpoint::SksServerEndpoint;
pub use service::SecurityKeyService;
pub use system_env::SystemEnv;
