//! Simulation Environment: virtual clock plus seeded RNG.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use keywheel_core::env::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Virtual instant: duration since the simulation epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimInstant(Duration);

impl std::ops::Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

/// Deterministic environment for simulation runs.
///
/// Time only moves when the test advances it, and all randomness flows
/// from one seed, so a failing scenario replays byte for byte.
#[derive(Clone)]
pub struct SimEnv {
    inner: Arc<Mutex<SimState>>,
}

struct SimState {
    now: SimInstant,
    rng: ChaCha8Rng,
}

impl SimEnv {
    /// Create a simulation environment from an RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState {
                now: SimInstant(Duration::ZERO),
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
        }
    }

    /// Advance the virtual clock.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.now = SimInstant(state.now.0 + by);
    }

    /// Time elapsed since the simulation epoch.
    pub fn elapsed(&self) -> Duration {
        self.lock().now.0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        // Simulation state survives a panicking test thread unchanged.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        self.lock().now
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }
}
