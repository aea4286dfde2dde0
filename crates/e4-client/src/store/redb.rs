//! Redb-backed durable key store.
//!
//! Each trait method runs in its own ACID transaction, so a crash mid-command
//! leaves either the old or the new key, never a torn write.

use std::{fmt, path::Path, sync::Arc};

use e4_crypto::{
    Identifier, KEY_SIZE, SigningKey, SymmetricKey, VerifyingKey, X25519PublicKey,
    verifying_key_from_bytes,
};
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use super::{KeyStore, KeyStoreSnapshot, KeyUpdate, StoreError};
use crate::identity::IdentityKey;

type BytesTable = TableDefinition<'static, &'static [u8], &'static [u8]>;

/// Table: topic_keys
/// Key: topic identifier [32 bytes]
/// Value: topic key [32 bytes]
const TOPIC_KEYS: BytesTable = TableDefinition::new(TOPIC_KEYS_NAME);
const TOPIC_KEYS_NAME: &str = "topic_keys";

/// Table: public_keys
/// Key: peer name identifier [32 bytes]
/// Value: Ed25519 public key [32 bytes]
const PUBLIC_KEYS: BytesTable = TableDefinition::new(PUBLIC_KEYS_NAME);
const PUBLIC_KEYS_NAME: &str = "public_keys";

/// Table: settings
/// Key: setting name
/// Value: `identity` as CBOR `StoredIdentity`, `c2_key` as 32 raw bytes,
/// `last_command` as a big-endian u64
const SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new(SETTINGS_NAME);
const SETTINGS_NAME: &str = "settings";

const IDENTITY: &str = "identity";
const C2_KEY: &str = "c2_key";
const LAST_COMMAND: &str = "last_command";

/// On-disk form of [`IdentityKey`].
#[derive(Serialize, Deserialize)]
enum StoredIdentity {
    Symmetric([u8; KEY_SIZE]),
    Ed25519Seed([u8; KEY_SIZE]),
}

/// Durable key store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbKeyStore {
    db: Arc<Database>,
}

impl RedbKeyStore {
    /// Open or create a key store database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(TOPIC_KEYS).map_err(io)?;
            let _ = txn.open_table(PUBLIC_KEYS).map_err(io)?;
            let _ = txn.open_table(SETTINGS).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Run `apply` in one write transaction. Nothing is committed if it fails.
    fn write(
        &self,
        apply: impl FnOnce(&WriteTransaction) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(io)?;
        apply(&txn)?;
        txn.commit().map_err(io)
    }

    fn get(
        &self,
        table: BytesTable,
        table_name: &'static str,
        key: &Identifier,
    ) -> Result<Option<[u8; 32]>, StoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(table).map_err(io)?;

        match table.get(key.as_bytes().as_slice()).map_err(io)? {
            Some(value) => fixed(table_name, value.value()).map(Some),
            None => Ok(None),
        }
    }

    fn setting(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(SETTINGS).map_err(io)?;
        Ok(table.get(name).map_err(io)?.map(|value| value.value().to_vec()))
    }
}

impl KeyStore for RedbKeyStore {
    fn topic_key(&self, topic: &Identifier) -> Result<Option<SymmetricKey>, StoreError> {
        Ok(self.get(TOPIC_KEYS, TOPIC_KEYS_NAME, topic)?.map(SymmetricKey::from_bytes))
    }

    fn set_topic_key(&self, topic: Identifier, key: SymmetricKey) -> Result<(), StoreError> {
        self.write(|txn| put(txn, TOPIC_KEYS, &topic, key.as_bytes()))
    }

    fn remove_topic_key(&self, topic: &Identifier) -> Result<(), StoreError> {
        self.write(|txn| remove(txn, TOPIC_KEYS, topic))
    }

    fn reset_topic_keys(&self) -> Result<(), StoreError> {
        self.write(|txn| clear(txn, TOPIC_KEYS))
    }

    fn identity_key(&self) -> Result<Option<IdentityKey>, StoreError> {
        self.setting(IDENTITY)?.map(|bytes| decode_identity(&bytes)).transpose()
    }

    fn set_identity_key(&self, key: IdentityKey) -> Result<(), StoreError> {
        let bytes = encode_identity(&key)?;
        self.write(|txn| put_setting(txn, IDENTITY, &bytes))
    }

    fn c2_key(&self) -> Result<Option<X25519PublicKey>, StoreError> {
        self.setting(C2_KEY)?
            .map(|bytes| fixed(SETTINGS_NAME, &bytes).map(X25519PublicKey::from))
            .transpose()
    }

    fn set_c2_key(&self, key: X25519PublicKey) -> Result<(), StoreError> {
        self.write(|txn| put_setting(txn, C2_KEY, key.as_bytes()))
    }

    fn public_key(&self, name: &Identifier) -> Result<Option<VerifyingKey>, StoreError> {
        self.get(PUBLIC_KEYS, PUBLIC_KEYS_NAME, name)?
            .map(|bytes| decode_public_key(&bytes))
            .transpose()
    }

    fn set_public_key(&self, name: Identifier, key: VerifyingKey) -> Result<(), StoreError> {
        self.write(|txn| put(txn, PUBLIC_KEYS, &name, key.as_bytes()))
    }

    fn remove_public_key(&self, name: &Identifier) -> Result<(), StoreError> {
        self.write(|txn| remove(txn, PUBLIC_KEYS, name))
    }

    fn reset_public_keys(&self) -> Result<(), StoreError> {
        self.write(|txn| clear(txn, PUBLIC_KEYS))
    }

    fn last_command_timestamp(&self) -> Result<Option<u64>, StoreError> {
        self.setting(LAST_COMMAND)?.map(|bytes| decode_timestamp(&bytes)).transpose()
    }

    fn apply_command(&self, update: KeyUpdate, timestamp: u64) -> Result<(), StoreError> {
        let identity = match &update {
            KeyUpdate::SetIdentityKey(key) => Some(encode_identity(key)?),
            _ => None,
        };

        self.write(|txn| {
            match &update {
                KeyUpdate::SetTopicKey { topic, key } => {
                    put(txn, TOPIC_KEYS, topic, key.as_bytes())?;
                },
                KeyUpdate::RemoveTopicKey { topic } => remove(txn, TOPIC_KEYS, topic)?,
                KeyUpdate::ResetTopicKeys => clear(txn, TOPIC_KEYS)?,
                KeyUpdate::SetIdentityKey(_) => {
                    if let Some(bytes) = &identity {
                        put_setting(txn, IDENTITY, bytes)?;
                    }
                },
                KeyUpdate::SetPublicKey { name, key } => {
                    put(txn, PUBLIC_KEYS, name, key.as_bytes())?;
                },
                KeyUpdate::RemovePublicKey { name } => remove(txn, PUBLIC_KEYS, name)?,
                KeyUpdate::ResetPublicKeys => clear(txn, PUBLIC_KEYS)?,
                KeyUpdate::SetC2Key(key) => put_setting(txn, C2_KEY, key.as_bytes())?,
            }

            let newest = {
                let settings = txn.open_table(SETTINGS).map_err(io)?;
                let last = settings.get(LAST_COMMAND).map_err(io)?;
                match last {
                    Some(value) => decode_timestamp(value.value())?.max(timestamp),
                    None => timestamp,
                }
            };
            put_setting(txn, LAST_COMMAND, &newest.to_be_bytes())
        })
    }

    fn snapshot(&self) -> Result<KeyStoreSnapshot, StoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let mut snapshot = KeyStoreSnapshot::default();

        let topics = txn.open_table(TOPIC_KEYS).map_err(io)?;
        for entry in topics.iter().map_err(io)? {
            let (key, value) = entry.map_err(io)?;
            let topic = Identifier::from_bytes(fixed(TOPIC_KEYS_NAME, key.value())?);
            let topic_key = SymmetricKey::from_bytes(fixed(TOPIC_KEYS_NAME, value.value())?);
            snapshot.topic_keys.insert(topic, topic_key);
        }

        let peers = txn.open_table(PUBLIC_KEYS).map_err(io)?;
        for entry in peers.iter().map_err(io)? {
            let (key, value) = entry.map_err(io)?;
            let name = Identifier::from_bytes(fixed(PUBLIC_KEYS_NAME, key.value())?);
            snapshot.public_keys.insert(name, decode_public_key(value.value())?);
        }

        let settings = txn.open_table(SETTINGS).map_err(io)?;
        if let Some(value) = settings.get(IDENTITY).map_err(io)? {
            snapshot.identity = Some(decode_identity(value.value())?);
        }
        if let Some(value) = settings.get(C2_KEY).map_err(io)? {
            snapshot.c2_key = Some(X25519PublicKey::from(fixed(SETTINGS_NAME, value.value())?));
        }
        if let Some(value) = settings.get(LAST_COMMAND).map_err(io)? {
            snapshot.last_command_timestamp = Some(decode_timestamp(value.value())?);
        }

        Ok(snapshot)
    }
}

fn put(
    txn: &WriteTransaction,
    table: BytesTable,
    key: &Identifier,
    value: &[u8],
) -> Result<(), StoreError> {
    let mut table = txn.open_table(table).map_err(io)?;
    table.insert(key.as_bytes().as_slice(), value).map_err(io)?;
    Ok(())
}

fn put_setting(txn: &WriteTransaction, name: &str, value: &[u8]) -> Result<(), StoreError> {
    let mut table = txn.open_table(SETTINGS).map_err(io)?;
    table.insert(name, value).map_err(io)?;
    Ok(())
}

fn remove(txn: &WriteTransaction, table: BytesTable, key: &Identifier) -> Result<(), StoreError> {
    let mut table = txn.open_table(table).map_err(io)?;
    table.remove(key.as_bytes().as_slice()).map_err(io)?;
    Ok(())
}

fn clear(txn: &WriteTransaction, table: BytesTable) -> Result<(), StoreError> {
    let mut table = txn.open_table(table).map_err(io)?;
    table.retain(|_, _| false).map_err(io)?;
    Ok(())
}

fn io(err: impl fmt::Display) -> StoreError {
    StoreError::Io(err.to_string())
}

fn fixed(table: &'static str, bytes: &[u8]) -> Result<[u8; 32], StoreError> {
    bytes.try_into().map_err(|_| StoreError::Corrupted {
        table,
        reason: format!("expected 32 bytes, found {}", bytes.len()),
    })
}

fn decode_public_key(bytes: &[u8]) -> Result<VerifyingKey, StoreError> {
    verifying_key_from_bytes(bytes)
        .map_err(|e| StoreError::Corrupted { table: PUBLIC_KEYS_NAME, reason: e.to_string() })
}

fn decode_timestamp(bytes: &[u8]) -> Result<u64, StoreError> {
    let bytes: [u8; 8] = bytes.try_into().map_err(|_| StoreError::Corrupted {
        table: SETTINGS_NAME,
        reason: format!("expected 8 timestamp bytes, found {}", bytes.len()),
    })?;
    Ok(u64::from_be_bytes(bytes))
}

fn encode_identity(key: &IdentityKey) -> Result<Zeroizing<Vec<u8>>, StoreError> {
    let mut stored = match key {
        IdentityKey::Symmetric(secret) => StoredIdentity::Symmetric(*secret.as_bytes()),
        IdentityKey::Ed25519(signing_key) => StoredIdentity::Ed25519Seed(signing_key.to_bytes()),
    };

    let mut bytes = Zeroizing::new(Vec::new());
    let encoded = ciborium::into_writer(&stored, &mut *bytes)
        .map_err(|e| StoreError::Serialization(e.to_string()));

    match &mut stored {
        StoredIdentity::Symmetric(key) | StoredIdentity::Ed25519Seed(key) => key.zeroize(),
    }
    encoded.map(|()| bytes)
}

fn decode_identity(bytes: &[u8]) -> Result<IdentityKey, StoreError> {
    let stored: StoredIdentity =
        ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;

    let identity = match stored {
        StoredIdentity::Symmetric(mut key) => {
            let identity = IdentityKey::Symmetric(SymmetricKey::from_bytes(key));
            key.zeroize();
            identity
        },
        StoredIdentity::Ed25519Seed(mut seed) => {
            let identity = IdentityKey::Ed25519(SigningKey::from_bytes(&seed));
            seed.zeroize();
            identity
        },
    };

    Ok(identity)
}
