//! Client
//!
//! Key store, client runtime and command issuer for the E4 protocol.
//!
//! # Architecture
//!
//! The runtime is Sans-IO. It receives events ([`ClientEvent`]), processes
//! them against its [`KeyStore`], and returns actions ([`ClientAction`]) for
//! the caller to execute on a [`Transport`]. Randomness and wall-clock time
//! come from an injected [`Environment`].
//!
//! # Components
//!
//! - [`ClientRuntime`]: per-client state machine (control channel, message
//!   protection)
//! - [`CommandIssuer`]: administrator side, builds protected commands
//! - [`KeyStore`]: storage contract, with [`MemoryKeyStore`],
//!   [`RedbKeyStore`] and [`ChaoticKeyStore`]
//! - [`IdentityKey`]: symmetric or Ed25519 client identity
//!
//! # Error Handling
//!
//! A rejected inbound frame is an ordinary `Err` that leaves the store
//! untouched. Only [`ClientError::is_fatal`] errors (store failures) warrant
//! stopping a listener.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod env;
mod error;
mod event;
mod identity;
mod issuer;
mod runtime;
pub mod store;
mod system_env;
mod transport;

pub use config::{ClientConfig, DEFAULT_MAX_CLOCK_SKEW, DEFAULT_MAX_COMMAND_AGE};
pub use env::Environment;
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent};
pub use identity::{IdentityKey, IdentityMode};
pub use issuer::{ClientTarget, CommandIssuer, ProtectedCommand};
pub use runtime::ClientRuntime;
pub use store::{
    ChaoticKeyStore, KeyStore, KeyStoreSnapshot, KeyUpdate, MemoryKeyStore, RedbKeyStore,
    StoreError,
};
pub use system_env::SystemEnv;
pub use transport::{Transport, TransportError};
