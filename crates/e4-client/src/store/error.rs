//! Key store errors

use thiserror::Error;

/// Errors from a key store backend.
///
/// Never caused by protocol input: a store error means the backend itself
/// failed, and the operation that hit it had no effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend I/O or transaction failure
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Stored value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored value decoded but is not a valid key
    #[error("corrupted entry in {table}: {reason}")]
    Corrupted {
        /// Table holding the entry
        table: &'static str,
        /// What was wrong with it
        reason: String,
    },
}
