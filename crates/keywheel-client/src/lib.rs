//! Keywheel pull client.
//!
//! Embedded in every publisher and subscriber process, the client
//! authenticates to a security keys service endpoint, pulls key batches for
//! its group, and installs them into the process-local mirror. The bound
//! [`GroupKeyBinding`] turns operational on the first successful install
//! and supplies keys to the writer/reader group's protect/unprotect path.
//!
//! The client never retries on its own and never blocks the event loop:
//! each [`SksClient::pull`] is one attempt whose outcome lands in a watch
//! channel the embedding loop polls. Re-polling on a schedule (to observe
//! server-side rotations) is the embedding loop's job.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod binding;
mod client;
mod error;
mod transport;

pub use binding::{GroupKeyBinding, SecurityMode, set_group_operational};
pub use client::{PullStatus, SksClient, SksClientState};
pub use error::{BindingError, PullFailure, SksClientError};
pub use transport::{
    ChannelConfig, ChannelError, ChannelIdentity, EndpointUrl, EndpointUrlError, SecureChannel,
    SecureChannelTransport,
};
