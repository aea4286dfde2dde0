//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (wall-clock time,
//! randomness). Production code uses [`SystemEnv`](crate::SystemEnv);
//! simulations substitute a seeded RNG and a virtual clock.

use e4_crypto::{KEY_SIZE, NONCE_SIZE, SymmetricKey};

/// Source of randomness and wall-clock time.
///
/// # Invariants
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Given the same seed, a simulated environment produces the same bytes
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Current wall-clock time as Unix seconds.
    ///
    /// Used to stamp outgoing commands and to enforce the freshness window on
    /// incoming ones. Unlike a monotonic clock this may jump; the freshness
    /// window absorbs small skew.
    fn wall_clock_secs(&self) -> u64;

    /// Fresh AEAD nonce.
    fn random_nonce(&self) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        self.random_bytes(&mut nonce);
        nonce
    }

    /// Fresh random symmetric key.
    fn random_key(&self) -> SymmetricKey {
        let mut bytes = [0u8; KEY_SIZE];
        self.random_bytes(&mut bytes);
        SymmetricKey::from_bytes(bytes)
    }
}
