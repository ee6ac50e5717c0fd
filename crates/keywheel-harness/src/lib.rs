//! Deterministic simulation harness for Keywheel testing.
//!
//! Cross-process scenarios - a security keys service plus independently
//! polling publisher and subscriber processes - run here without any real
//! network or clock:
//!
//! - [`SimEnv`]: virtual monotonic clock advanced manually, seeded ChaCha
//!   RNG. Same seed, same key material, same schedule - every run replays.
//! - [`SimNetwork`]: in-memory secure-channel transport. Channel
//!   establishment performs the identity check a real channel stack would
//!   (anonymous rejection, username/password), and every call round-trips
//!   through the CBOR codec so the wire format is exercised end to end.
//!
//! Fault injection covers the failure taxonomy: unknown or offline
//! authorities surface as closed connections, bad credentials as rejected
//! authentication.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod sim_env;
pub mod sim_network;

pub use sim_env::{SimEnv, SimInstant};
pub use sim_network::{SimChannel, SimNetwork};

/// Install a test subscriber once per process; respects `RUST_LOG`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
