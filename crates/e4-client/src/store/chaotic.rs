//! Chaotic key store wrapper for fault injection testing
//!
//! Randomly fails operations before they reach the wrapped store, so tests can
//! check that a failed command leaves keys untouched and that the runtime
//! keeps serving afterwards.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use e4_crypto::{Identifier, SymmetricKey, VerifyingKey, X25519PublicKey};

use super::{KeyStore, KeyStoreSnapshot, KeyUpdate, StoreError};
use crate::identity::IdentityKey;

/// Key store wrapper that randomly injects failures
///
/// Failures are decided before delegating, so an injected failure never
/// reaches the inner store. Reads and writes are both subject to injection;
/// `snapshot` is not, so tests can always inspect the inner state.
#[derive(Clone)]
pub struct ChaoticKeyStore<S: KeyStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Operations attempted, including failed ones
    operation_count: Arc<AtomicUsize>,
    /// Operations that were failed on purpose
    injected_failures: Arc<AtomicUsize>,
}

/// Linear congruential generator: deterministic, so chaos runs reproduce from
/// their seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: KeyStore> ChaoticKeyStore<S> {
    /// Wrap `inner` with the default seed.
    ///
    /// `failure_rate` is clamped to [0.0, 1.0].
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Wrap `inner` with an explicit seed for reproducible chaos.
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
            injected_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    /// Operations that failed by injection.
    pub fn injected_failures(&self) -> usize {
        self.injected_failures.load(Ordering::Relaxed)
    }

    fn chaos(&self) -> Result<(), StoreError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        let roll = self.rng.lock().unwrap_or_else(PoisonError::into_inner).next();
        if roll < self.failure_rate {
            self.injected_failures.fetch_add(1, Ordering::Relaxed);
            return Err(StoreError::Io("chaotic failure injection".to_string()));
        }

        Ok(())
    }
}

impl<S: KeyStore> KeyStore for ChaoticKeyStore<S> {
    fn topic_key(&self, topic: &Identifier) -> Result<Option<SymmetricKey>, StoreError> {
        self.chaos()?;
        self.inner.topic_key(topic)
    }

    fn set_topic_key(&self, topic: Identifier, key: SymmetricKey) -> Result<(), StoreError> {
        self.chaos()?;
        self.inner.set_topic_key(topic, key)
    }

    fn remove_topic_key(&self, topic: &Identifier) -> Result<(), StoreError> {
        self.chaos()?;
        self.inner.remove_topic_key(topic)
    }

    fn reset_topic_keys(&self) -> Result<(), StoreError> {
        self.chaos()?;
        self.inner.reset_topic_keys()
    }

    fn identity_key(&self) -> Result<Option<IdentityKey>, StoreError> {
        self.chaos()?;
        self.inner.identity_key()
    }

    fn set_identity_key(&self, key: IdentityKey) -> Result<(), StoreError> {
        self.chaos()?;
        self.inner.set_identity_key(key)
    }

    fn c2_key(&self) -> Result<Option<X25519PublicKey>, StoreError> {
        self.chaos()?;
        self.inner.c2_key()
    }

    fn set_c2_key(&self, key: X25519PublicKey) -> Result<(), StoreError> {
        self.chaos()?;
        self.inner.set_c2_key(key)
    }

    fn public_key(&self, name: &Identifier) -> Result<Option<VerifyingKey>, StoreError> {
        self.chaos()?;
        self.inner.public_key(name)
    }

    fn set_public_key(&self, name: Identifier, key: VerifyingKey) -> Result<(), StoreError> {
        self.chaos()?;
        self.inner.set_public_key(name, key)
    }

    fn remove_public_key(&self, name: &Identifier) -> Result<(), StoreError> {
        self.chaos()?;
        self.inner.remove_public_key(name)
    }

    fn reset_public_keys(&self) -> Result<(), StoreError> {
        self.chaos()?;
        self.inner.reset_public_keys()
    }

    fn last_command_timestamp(&self) -> Result<Option<u64>, StoreError> {
        self.chaos()?;
        self.inner.last_command_timestamp()
    }

    fn apply_command(&self, update: KeyUpdate, timestamp: u64) -> Result<(), StoreError> {
        self.chaos()?;
        self.inner.apply_command(update, timestamp)
    }

    fn snapshot(&self) -> Result<KeyStoreSnapshot, StoreError> {
        self.inner.snapshot()
    }
}
