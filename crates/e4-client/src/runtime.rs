//! Client runtime.
//!
//! The `ClientRuntime` is the per-client state machine. It holds no key
//! material of its own: every key lives in the injected [`KeyStore`], and the
//! runtime only serializes access to it.
//!
//! # Locking
//!
//! Applying a command is a read-modify-write on the store (read the identity
//! and C2 key, then mutate). It runs under the write half of a lock; message
//! protection runs under the read half. A topic-key rotation therefore never
//! interleaves with an encrypt or decrypt on the same runtime.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use e4_crypto::{
    CryptoError, Identifier, VerifyingKey, control_channel, decrypt, decrypt_with_aad,
    derive_identifier, encrypt_with_nonce, open_command, verifying_key_from_bytes,
    x25519_public_key_from_bytes,
};
use e4_proto::{Command, ControlFrame, control_topic_path, topic_identifier};
use zeroize::Zeroizing;

use crate::{
    config::ClientConfig,
    env::Environment,
    error::ClientError,
    event::{ClientAction, ClientEvent},
    identity::{IdentityKey, IdentityMode},
    store::{KeyStore, KeyUpdate},
};

/// Stateful E4 client.
///
/// Generic over the key store `S` and environment `E`. Methods take `&self`,
/// so one runtime can be shared across threads behind an `Arc`.
pub struct ClientRuntime<S: KeyStore, E: Environment> {
    client_id: Identifier,
    control_topic: String,
    store: RwLock<S>,
    env: E,
    config: ClientConfig,
}

impl<S: KeyStore, E: Environment> ClientRuntime<S, E> {
    /// Runtime for a client whose store already holds its identity key.
    ///
    /// # Errors
    ///
    /// - `NotProvisioned` if the store has no identity key
    /// - `Store` if the store cannot be read
    pub fn new(
        client_id: Identifier,
        store: S,
        env: E,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        if store.identity_key()?.is_none() {
            return Err(ClientError::NotProvisioned);
        }

        Ok(Self {
            client_id,
            control_topic: control_topic_path(&client_id),
            store: RwLock::new(store),
            env,
            config,
        })
    }

    /// Write `identity` into `store`, then build the runtime.
    pub fn provision(
        client_id: Identifier,
        identity: IdentityKey,
        store: S,
        env: E,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        store.set_identity_key(identity)?;
        Self::new(client_id, store, env, config)
    }

    /// This client's identifier.
    pub fn client_id(&self) -> &Identifier {
        &self.client_id
    }

    /// Control channel identifier: `SHA-256(client_id)`.
    pub fn control_topic(&self) -> Identifier {
        control_channel(&self.client_id)
    }

    /// Transport path of the control channel.
    pub fn control_topic_path(&self) -> &str {
        &self.control_topic
    }

    /// Runtime configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Handle to the key store.
    ///
    /// Mutating the store through this handle bypasses the runtime's lock.
    pub fn store(&self) -> S {
        self.read_store().clone()
    }

    /// Process an event and return resulting actions.
    pub fn handle(&self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::MessageReceived { topic, payload } => {
                if topic == self.control_topic {
                    let command = self.receive_control(&payload)?;
                    Ok(vec![ClientAction::CommandApplied { command: command.tag() }])
                } else {
                    let plaintext = self.unprotect_message(&payload, &topic)?;
                    Ok(vec![ClientAction::DeliverMessage { topic, plaintext }])
                }
            },
            ClientEvent::PublishMessage { topic, plaintext } => {
                let payload = self.protect_message(&plaintext, &topic)?;
                Ok(vec![ClientAction::Publish { topic, payload }])
            },
        }
    }

    /// Authenticate, decode and apply one control frame.
    ///
    /// Returns the applied command. On any error the store is unchanged.
    ///
    /// # Errors
    ///
    /// - `Crypto(AuthenticationFailed)`: frame too short, wrong key, tampered
    /// - `MissingC2Key`: public-key client without an administrator key
    /// - `CommandExpired` / `CommandFromFuture`: outside the freshness window,
    ///   or older than the newest command already applied
    /// - `Command`: unknown tag or malformed payload
    /// - `UnsupportedCommand`: command not valid for this identity mode
    /// - `Crypto(InvalidKeyEncoding)`: command carries an unusable public key
    /// - `Store`: backend failure
    pub fn receive_control(&self, frame: &[u8]) -> Result<Command, ClientError> {
        let result = self.apply_control(frame);

        match &result {
            Ok(command) => {
                tracing::debug!(
                    client = %self.client_id,
                    command = command.tag().name(),
                    "applied control command"
                );
            },
            Err(error) => {
                tracing::warn!(
                    client = %self.client_id,
                    error = %error,
                    fatal = error.is_fatal(),
                    "rejected control frame"
                );
            },
        }

        result
    }

    /// Encrypt `plaintext` for publication on `topic`.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` if no key is stored for `topic`
    pub fn protect_message(&self, plaintext: &[u8], topic: &str) -> Result<Vec<u8>, ClientError> {
        let topic = topic_identifier(topic);
        let store = self.read_store();

        let key = store.topic_key(&topic)?.ok_or(ClientError::KeyNotFound { topic })?;
        Ok(encrypt_with_nonce(plaintext, &key, self.env.random_nonce()))
    }

    /// Decrypt a message received on `topic`.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` if no key is stored for `topic`
    /// - `Crypto(AuthenticationFailed)` if the message does not authenticate
    pub fn unprotect_message(
        &self,
        ciphertext: &[u8],
        topic: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let topic = topic_identifier(topic);
        let store = self.read_store();

        let key = store.topic_key(&topic)?.ok_or(ClientError::KeyNotFound { topic })?;
        Ok(decrypt(ciphertext, &key)?)
    }

    /// Ed25519 public key stored for peer `name`.
    ///
    /// # Errors
    ///
    /// - `PeerKeyNotFound` if no key is stored under `name`
    pub fn peer_public_key(&self, name: &str) -> Result<VerifyingKey, ClientError> {
        let name = derive_identifier(name);
        let store = self.read_store();

        store.public_key(&name)?.ok_or(ClientError::PeerKeyNotFound { name })
    }

    fn apply_control(&self, frame: &[u8]) -> Result<Command, ClientError> {
        let store = self.write_store();

        let identity = store.identity_key()?.ok_or(ClientError::NotProvisioned)?;

        // Short frames fail the same way as forged ones
        let frame = ControlFrame::parse(frame).map_err(|_| CryptoError::AuthenticationFailed)?;

        let plaintext = Zeroizing::new(match &identity {
            IdentityKey::Symmetric(key) => decrypt_with_aad(frame.body, &frame.header, key)?,
            IdentityKey::Ed25519(_) => {
                let c2_key = store.c2_key()?.ok_or(ClientError::MissingC2Key)?;
                let Some(secret) = identity.x25519_secret() else {
                    unreachable!("Ed25519 identities always have an X25519 secret");
                };
                open_command(frame.body, &frame.header, &c2_key, &secret)?
            },
        });

        self.check_freshness(frame.timestamp, store.last_command_timestamp()?)?;

        let command = Command::decode(&plaintext)?;

        let mode = identity.mode();
        if mode == IdentityMode::Symmetric && command.tag().requires_public_key_identity() {
            return Err(ClientError::UnsupportedCommand { command: command.tag().name(), mode });
        }

        store.apply_command(key_update(&identity, &command)?, frame.timestamp)?;
        Ok(command)
    }

    /// `newest` is the timestamp of the last applied command; anything older is
    /// refused even inside the window.
    fn check_freshness(&self, timestamp: u64, newest: Option<u64>) -> Result<(), ClientError> {
        let now = self.env.wall_clock_secs();

        if timestamp.saturating_add(self.config.max_command_age.as_secs()) < now
            || newest.is_some_and(|newest| timestamp < newest)
        {
            return Err(ClientError::CommandExpired { timestamp, now });
        }
        if timestamp > now.saturating_add(self.config.max_clock_skew.as_secs()) {
            return Err(ClientError::CommandFromFuture { timestamp, now });
        }

        Ok(())
    }

    fn read_store(&self) -> RwLockReadGuard<'_, S> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, S> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The single store mutation an authenticated command performs.
///
/// Key material is validated here, so a rejected key never reaches the store.
fn key_update(identity: &IdentityKey, command: &Command) -> Result<KeyUpdate, ClientError> {
    let update = match command {
        Command::RemoveTopicKey { topic } => KeyUpdate::RemoveTopicKey { topic: *topic },
        Command::ResetTopicKeys => KeyUpdate::ResetTopicKeys,
        Command::SetIdKey { key } => KeyUpdate::SetIdentityKey(identity.rotated(key)),
        Command::SetTopicKey { key, topic } => {
            KeyUpdate::SetTopicKey { topic: *topic, key: key.clone() }
        },
        Command::RemovePubKey { name } => KeyUpdate::RemovePublicKey { name: *name },
        Command::ResetPubKeys => KeyUpdate::ResetPublicKeys,
        Command::SetPubKey { public_key, name } => {
            KeyUpdate::SetPublicKey { name: *name, key: verifying_key_from_bytes(public_key)? }
        },
        Command::SetC2Key { public_key } => {
            KeyUpdate::SetC2Key(x25519_public_key_from_bytes(*public_key)?)
        },
    };

    Ok(update)
}
