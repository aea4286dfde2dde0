//! CLI errors.

use std::path::PathBuf;

use e4_client::{ClientError, StoreError};
use e4_crypto::CryptoError;
use thiserror::Error;

/// Errors from `e4` subcommands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading or writing a key file failed.
    #[error("{path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Key file does not hold a 32-byte key.
    #[error("{path}: expected {expected} bytes, found {actual}")]
    KeyFileSize {
        /// File involved
        path: PathBuf,
        /// Required size
        expected: usize,
        /// Size on disk
        actual: usize,
    },

    /// Key derivation or conversion failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Client runtime rejected an operation.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Key store could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A simulated flow did not end in the expected state.
    #[error("simulation diverged: {0}")]
    Diverged(String),
}
