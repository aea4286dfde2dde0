//! Fixed-size key and identifier types.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Size of an identifier (SHA-256 output).
pub const ID_SIZE: usize = 32;

/// Size of a symmetric key (topic key, symmetric identity key, Ed25519 seed).
pub const KEY_SIZE: usize = 32;

/// Size of an Ed25519 or X25519 public key.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Opaque 32-byte name for a client, topic or peer.
///
/// Produced by hashing a human-readable name; see
/// [`derive_identifier`](crate::derive_identifier). Identifiers are compared
/// and ordered bytewise so they can key both hash and ordered maps.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier([u8; ID_SIZE]);

impl Identifier {
    /// Wrap raw identifier bytes.
    pub const fn from_bytes(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse an identifier from a slice of exactly [`ID_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; ID_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidLength { expected: ID_SIZE, actual: bytes.len() })?;
        Ok(Self(array))
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; ID_SIZE]> for Identifier {
    fn from(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({:02x}{:02x}{:02x}{:02x}..)", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// 32-byte symmetric key.
///
/// Used for topic keys, symmetric identity keys and (reinterpreted) Ed25519
/// seeds carried by `SetIdKey`. Zeroized on drop; equality is constant-time;
/// `Debug` never prints key bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a key from a slice of exactly [`KEY_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidLength { expected: KEY_SIZE, actual: bytes.len() })?;
        Ok(Self(array))
    }

    /// Generate a fresh key from the OS RNG.
    ///
    /// # Panics
    ///
    /// Panics if the OS RNG fails. A process without working entropy cannot
    /// issue keys safely.
    #[allow(clippy::expect_used)]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        getrandom::fill(&mut bytes)
            .expect("invariant: OS RNG failure is unrecoverable - cannot generate keys");
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}
