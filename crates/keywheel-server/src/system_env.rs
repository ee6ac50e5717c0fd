//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` backs the service in real deployments: a monotonic system
//! clock that advances naturally and OS cryptographic randomness. Behavior
//! is therefore non-deterministic - tests use the harness simulation
//! environment instead.

use keywheel_core::env::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Security
///
/// Randomness comes from getrandom (e.g., /dev/urandom on Linux,
/// `BCryptGenRandom` on Windows), which is suitable for minting group key
/// secrets.
///
/// # Panics
///
/// Panics if the OS RNG fails. This is intentional - a key service without
/// functioning cryptographic randomness cannot operate securely, and RNG
/// failure indicates OS-level breakage.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - the service cannot mint keys");
    }
}
