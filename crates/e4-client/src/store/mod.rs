//! Key store abstraction for the E4 client
//!
//! The runtime never owns key material directly: it holds a [`KeyStore`]
//! handle injected at construction. The trait is synchronous, matching the
//! rest of the runtime.
//!
//! # Atomicity
//!
//! Every mutating method is a single atomic step. An applied command is one
//! [`KeyStore::apply_command`] call: its [`KeyUpdate`] and the new command
//! timestamp are written together, so a failed store call leaves the store as
//! it was.

mod chaotic;
mod error;
mod memory;
mod redb;

use std::collections::BTreeMap;

pub use chaotic::ChaoticKeyStore;
use e4_crypto::{Identifier, SymmetricKey, VerifyingKey, X25519PublicKey};
pub use error::StoreError;
pub use memory::MemoryKeyStore;

pub use self::redb::RedbKeyStore;
use crate::identity::IdentityKey;

/// Full contents of a key store at one point in time.
///
/// Comparable, so tests can assert that a rejected command changed nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyStoreSnapshot {
    /// Topic identifier to topic key
    pub topic_keys: BTreeMap<Identifier, SymmetricKey>,
    /// Peer name identifier to Ed25519 public key
    pub public_keys: BTreeMap<Identifier, VerifyingKey>,
    /// The client's identity key
    pub identity: Option<IdentityKey>,
    /// The administrator's X25519 public key
    pub c2_key: Option<X25519PublicKey>,
    /// Timestamp of the newest applied command, Unix seconds
    pub last_command_timestamp: Option<u64>,
}

/// Store mutation carried by one authenticated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyUpdate {
    /// Store `key` for `topic`
    SetTopicKey {
        /// Topic identifier
        topic: Identifier,
        /// New topic key
        key: SymmetricKey,
    },
    /// Remove the key for `topic`
    RemoveTopicKey {
        /// Topic identifier
        topic: Identifier,
    },
    /// Remove every topic key
    ResetTopicKeys,
    /// Replace the identity key
    SetIdentityKey(IdentityKey),
    /// Store `key` under peer `name`
    SetPublicKey {
        /// Peer name identifier
        name: Identifier,
        /// Validated Ed25519 public key
        key: VerifyingKey,
    },
    /// Remove the public key stored under `name`
    RemovePublicKey {
        /// Peer name identifier
        name: Identifier,
    },
    /// Remove every peer public key
    ResetPublicKeys,
    /// Replace the administrator's public key
    SetC2Key(X25519PublicKey),
}

/// Storage for one client's keys.
///
/// Must be Clone (the runtime and tooling may hold handles to the same store),
/// Send + Sync (thread-safe), and synchronous. Implementations share internal
/// state, so clones observe the same contents.
///
/// # Invariants
///
/// - At most one key per topic and one public key per peer name
/// - Lookups return `Ok(None)` for absent entries rather than failing
/// - Removing an absent entry is a successful no-op
/// - The newest command timestamp only moves forward
pub trait KeyStore: Clone + Send + Sync + 'static {
    /// Key for `topic`, if one is stored.
    fn topic_key(&self, topic: &Identifier) -> Result<Option<SymmetricKey>, StoreError>;

    /// Store `key` for `topic`, replacing any previous key.
    fn set_topic_key(&self, topic: Identifier, key: SymmetricKey) -> Result<(), StoreError>;

    /// Remove the key for `topic`.
    fn remove_topic_key(&self, topic: &Identifier) -> Result<(), StoreError>;

    /// Remove every topic key.
    fn reset_topic_keys(&self) -> Result<(), StoreError>;

    /// The client's identity key.
    fn identity_key(&self) -> Result<Option<IdentityKey>, StoreError>;

    /// Replace the identity key.
    fn set_identity_key(&self, key: IdentityKey) -> Result<(), StoreError>;

    /// The administrator's public key.
    fn c2_key(&self) -> Result<Option<X25519PublicKey>, StoreError>;

    /// Replace the administrator's public key.
    fn set_c2_key(&self, key: X25519PublicKey) -> Result<(), StoreError>;

    /// Public key stored under peer `name`.
    fn public_key(&self, name: &Identifier) -> Result<Option<VerifyingKey>, StoreError>;

    /// Store `key` under peer `name`, replacing any previous key.
    fn set_public_key(&self, name: Identifier, key: VerifyingKey) -> Result<(), StoreError>;

    /// Remove the public key stored under `name`.
    fn remove_public_key(&self, name: &Identifier) -> Result<(), StoreError>;

    /// Remove every peer public key.
    fn reset_public_keys(&self) -> Result<(), StoreError>;

    /// Timestamp of the newest command recorded by [`apply_command`](Self::apply_command).
    fn last_command_timestamp(&self) -> Result<Option<u64>, StoreError>;

    /// Apply `update` and raise the newest command timestamp to `timestamp`,
    /// as one atomic step.
    ///
    /// The recorded timestamp never decreases.
    fn apply_command(&self, update: KeyUpdate, timestamp: u64) -> Result<(), StoreError>;

    /// Consistent copy of the whole store.
    fn snapshot(&self) -> Result<KeyStoreSnapshot, StoreError>;
}
