//! Codec errors

use thiserror::Error;

/// Result alias for codec operations
pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors from decoding commands and control frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// First byte is not a known command tag
    #[error("unknown command tag {0:#04x}")]
    UnknownCommand(u8),

    /// Known tag, wrong total length (or empty input)
    #[error("malformed command: expected {expected} bytes, got {actual}")]
    MalformedCommand {
        /// Length required by the tag, including the tag byte
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Control frame is too short to hold a timestamp, nonce and tag
    #[error("control frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum frame length
        expected: usize,
        /// Length received
        actual: usize,
    },
}
