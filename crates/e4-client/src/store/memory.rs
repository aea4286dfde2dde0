use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use e4_crypto::{Identifier, SymmetricKey, VerifyingKey, X25519PublicKey};

use super::{KeyStore, KeyStoreSnapshot, KeyUpdate, StoreError};
use crate::identity::IdentityKey;

/// In-memory key store for tests, simulation and embedded clients
///
/// All state lives behind one `Arc<Mutex<>>`, so clones share contents and
/// every method is atomic. A poisoned lock is recovered: each mutation is a
/// single map operation, so a panicking holder cannot leave it half-applied.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    inner: Arc<Mutex<KeyStoreSnapshot>>,
}

impl MemoryKeyStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `identity`.
    pub fn with_identity(identity: IdentityKey) -> Self {
        let store = Self::new();
        store.lock().identity = Some(identity);
        store
    }

    /// Number of stored topic keys.
    pub fn topic_key_count(&self) -> usize {
        self.lock().topic_keys.len()
    }

    fn lock(&self) -> MutexGuard<'_, KeyStoreSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyStore for MemoryKeyStore {
    fn topic_key(&self, topic: &Identifier) -> Result<Option<SymmetricKey>, StoreError> {
        Ok(self.lock().topic_keys.get(topic).cloned())
    }

    fn set_topic_key(&self, topic: Identifier, key: SymmetricKey) -> Result<(), StoreError> {
        self.lock().topic_keys.insert(topic, key);
        Ok(())
    }

    fn remove_topic_key(&self, topic: &Identifier) -> Result<(), StoreError> {
        self.lock().topic_keys.remove(topic);
        Ok(())
    }

    fn reset_topic_keys(&self) -> Result<(), StoreError> {
        self.lock().topic_keys = BTreeMap::new();
        Ok(())
    }

    fn identity_key(&self) -> Result<Option<IdentityKey>, StoreError> {
        Ok(self.lock().identity.clone())
    }

    fn set_identity_key(&self, key: IdentityKey) -> Result<(), StoreError> {
        self.lock().identity = Some(key);
        Ok(())
    }

    fn c2_key(&self) -> Result<Option<X25519PublicKey>, StoreError> {
        Ok(self.lock().c2_key)
    }

    fn set_c2_key(&self, key: X25519PublicKey) -> Result<(), StoreError> {
        self.lock().c2_key = Some(key);
        Ok(())
    }

    fn public_key(&self, name: &Identifier) -> Result<Option<VerifyingKey>, StoreError> {
        Ok(self.lock().public_keys.get(name).copied())
    }

    fn set_public_key(&self, name: Identifier, key: VerifyingKey) -> Result<(), StoreError> {
        self.lock().public_keys.insert(name, key);
        Ok(())
    }

    fn remove_public_key(&self, name: &Identifier) -> Result<(), StoreError> {
        self.lock().public_keys.remove(name);
        Ok(())
    }

    fn reset_public_keys(&self) -> Result<(), StoreError> {
        self.lock().public_keys.clear();
        Ok(())
    }

    fn last_command_timestamp(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.lock().last_command_timestamp)
    }

    fn apply_command(&self, update: KeyUpdate, timestamp: u64) -> Result<(), StoreError> {
        let mut state = self.lock();

        match update {
            KeyUpdate::SetTopicKey { topic, key } => {
                state.topic_keys.insert(topic, key);
            },
            KeyUpdate::RemoveTopicKey { topic } => {
                state.topic_keys.remove(&topic);
            },
            KeyUpdate::ResetTopicKeys => state.topic_keys.clear(),
            KeyUpdate::SetIdentityKey(key) => state.identity = Some(key),
            KeyUpdate::SetPublicKey { name, key } => {
                state.public_keys.insert(name, key);
            },
            KeyUpdate::RemovePublicKey { name } => {
                state.public_keys.remove(&name);
            },
            KeyUpdate::ResetPublicKeys => state.public_keys.clear(),
            KeyUpdate::SetC2Key(key) => state.c2_key = Some(key),
        }

        let newest = state.last_command_timestamp.map_or(timestamp, |last| last.max(timestamp));
        state.last_command_timestamp = Some(newest);
        Ok(())
    }

    fn snapshot(&self) -> Result<KeyStoreSnapshot, StoreError> {
        Ok(self.lock().clone())
    }
}
