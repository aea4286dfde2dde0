//! Client error types.

use e4_crypto::{CryptoError, Identifier};
use e4_proto::CommandError;
use thiserror::Error;

use crate::{identity::IdentityMode, store::StoreError, transport::TransportError};

/// Errors from the client runtime and command issuer.
///
/// Only store failures are fatal. Every other variant is caused by inbound
/// data or by asking for a key the client does not hold: log it, drop the
/// message, keep listening.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Authentication, key derivation or key validation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Decrypted command could not be decoded.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Key store backend failed.
    #[error("key store failure: {0}")]
    Store(#[from] StoreError),

    /// Transport failed to publish or subscribe.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No key for the topic.
    #[error("no key for topic {topic}")]
    KeyNotFound {
        /// Topic identifier
        topic: Identifier,
    },

    /// No public key stored for the peer.
    #[error("no public key for peer {name}")]
    PeerKeyNotFound {
        /// Peer name identifier
        name: Identifier,
    },

    /// Public-key client has no administrator key to open commands with.
    #[error("no C2 public key provisioned")]
    MissingC2Key,

    /// Store holds no identity key.
    #[error("client has no identity key")]
    NotProvisioned,

    /// Command timestamp is older than the freshness window, or older than
    /// the newest command already applied.
    #[error("command expired: issued at {timestamp}, now {now}")]
    CommandExpired {
        /// Issue time, Unix seconds
        timestamp: u64,
        /// Local time, Unix seconds
        now: u64,
    },

    /// Command timestamp is ahead of the local clock by more than the allowed
    /// skew.
    #[error("command from the future: issued at {timestamp}, now {now}")]
    CommandFromFuture {
        /// Issue time, Unix seconds
        timestamp: u64,
        /// Local time, Unix seconds
        now: u64,
    },

    /// Command is not valid for this client's identity mode.
    #[error("{command} is not supported by {mode} clients")]
    UnsupportedCommand {
        /// Command name
        command: &'static str,
        /// Identity mode of the client
        mode: IdentityMode,
    },
}

impl ClientError {
    /// Whether the operation failed for reasons unrelated to its input.
    ///
    /// A fatal error means the key store itself is unusable and retrying the
    /// same input will not help. Non-fatal errors reject one message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
