//! Error types for cryptographic operations

use thiserror::Error;

/// Errors from key derivation, conversion and AEAD operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Password is shorter than the enforced minimum.
    #[error("password too short: need at least {min} characters, got {actual}")]
    WeakPassword {
        /// Minimum accepted length in characters
        min: usize,
        /// Length of the rejected password in characters
        actual: usize,
    },

    /// Key bytes do not encode a usable key.
    #[error("invalid key encoding: {reason}")]
    InvalidKeyEncoding {
        /// What was wrong with the encoding
        reason: &'static str,
    },

    /// Byte string has the wrong length for the requested type.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Ciphertext failed to authenticate.
    ///
    /// Deliberately carries no detail: truncated framing, tag mismatch, wrong
    /// key and degenerate Diffie-Hellman output are indistinguishable.
    #[error("authentication failed")]
    AuthenticationFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failure_has_no_detail() {
        assert_eq!(CryptoError::AuthenticationFailed.to_string(), "authentication failed");
    }

    #[test]
    fn error_display() {
        let err = CryptoError::WeakPassword { min: 16, actual: 3 };
        assert_eq!(err.to_string(), "password too short: need at least 16 characters, got 3");
    }
}
