//! Environment abstraction for deterministic testing.
//!
//! Decouples key lifecycle logic from system resources (time, randomness).
//! Production processes use a real monotonic clock and OS RNG; the test
//! harness substitutes a virtual clock and a seeded RNG so rotation and
//! convergence scenarios replay identically.

use std::time::Duration;

use keywheel_crypto::SECRET_SIZE;

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - This method MUST return values that never decrease within a single
    ///   execution context.
    fn now(&self) -> Self::Instant;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG in production
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates the raw secret for one fresh key.
    ///
    /// Convenience for provisioning and rotation, which mint keys from
    /// environment entropy.
    fn fresh_secret(&self) -> [u8; SECRET_SIZE] {
        let mut bytes = [0u8; SECRET_SIZE];
        self.random_bytes(&mut bytes);
        bytes
    }
}

/// Test environments shared by unit and integration tests.
pub mod test_utils {
    use std::{
        sync::{Arc, Mutex, PoisonError},
        time::Duration,
    };

    use super::Environment;

    /// Deterministic environment with a manually advanced clock and a
    /// counter-based byte stream instead of a real RNG.
    ///
    /// Suitable for unit tests that need distinct (not secure) key material
    /// and precise control over rotation deadlines.
    #[derive(Clone)]
    pub struct MockEnv {
        inner: Arc<Mutex<MockState>>,
    }

    struct MockState {
        now: MockInstant,
        counter: u64,
    }

    /// Virtual instant: duration since the mock epoch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    pub struct MockInstant(Duration);

    impl std::ops::Sub for MockInstant {
        type Output = Duration;

        fn sub(self, rhs: Self) -> Duration {
            self.0.saturating_sub(rhs.0)
        }
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockEnv {
        /// Create a mock environment starting at the epoch.
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(MockState {
                    now: MockInstant(Duration::ZERO),
                    counter: 0,
                })),
            }
        }

        /// Advance the virtual clock.
        pub fn advance(&self, by: Duration) {
            let mut state = self.lock();
            state.now = MockInstant(state.now.0 + by);
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
            // State stays consistent across a panicking test thread.
            self.inner.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl Environment for MockEnv {
        type Instant = MockInstant;

        fn now(&self) -> MockInstant {
            self.lock().now
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let mut state = self.lock();
            for byte in buffer.iter_mut() {
                state.counter = state.counter.wrapping_add(1);
                *byte = (state.counter % 251) as u8;
            }
        }
    }

}
