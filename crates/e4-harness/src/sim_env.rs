//! Simulated environment: seeded randomness and a virtual wall clock.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use e4_client::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Unix time the virtual clock starts at (2023-11-14T22:13:20Z).
pub const SIM_EPOCH: u64 = 1_700_000_000;

/// Deterministic [`Environment`] for simulations.
///
/// Clones share the RNG stream and the clock, so every client and issuer built
/// from one `SimEnv` sees the same time and draws from one reproducible
/// sequence.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
    now: Arc<AtomicU64>,
}

impl SimEnv {
    /// Environment seeded with `seed`, clock at [`SIM_EPOCH`].
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            now: Arc::new(AtomicU64::new(SIM_EPOCH)),
        }
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    /// Set the virtual clock, e.g. to model a client whose clock lags.
    pub fn set_time(&self, unix_secs: u64) {
        self.now.store(unix_secs, Ordering::SeqCst);
    }

    /// Environment with its own clock but the same RNG stream.
    #[must_use]
    pub fn with_independent_clock(&self) -> Self {
        Self {
            rng: Arc::clone(&self.rng),
            now: Arc::new(AtomicU64::new(self.now.load(Ordering::SeqCst))),
        }
    }
}

impl Environment for SimEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }

    fn wall_clock_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
