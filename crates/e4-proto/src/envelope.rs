//! Framing of protected commands on a control topic.
//!
//! The encrypted body is opaque here; this module only splits off and prepends
//! the authenticated timestamp header.

use bytes::BufMut;
use e4_crypto::MIN_CIPHERTEXT_SIZE;

use crate::errors::{CommandError, Result};

/// Size of the timestamp header (big-endian Unix seconds).
pub const TIMESTAMP_SIZE: usize = 8;

/// Smallest control frame that can authenticate: header, nonce and tag.
pub const MIN_CONTROL_FRAME_SIZE: usize = TIMESTAMP_SIZE + MIN_CIPHERTEXT_SIZE;

/// Borrowed view of a protected command.
///
/// ```text
/// [timestamp: 8 bytes BE][nonce ‖ ciphertext ‖ tag]
/// ```
///
/// `header` is passed as associated data when sealing and opening `body`, so a
/// modified timestamp fails authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrame<'a> {
    /// Issue time, Unix seconds
    pub timestamp: u64,
    /// Raw timestamp bytes, the associated data for `body`
    pub header: [u8; TIMESTAMP_SIZE],
    /// `nonce ‖ ciphertext ‖ tag`
    pub body: &'a [u8],
}

impl<'a> ControlFrame<'a> {
    /// Split a received frame into header and body.
    ///
    /// # Errors
    ///
    /// - `FrameTooShort` if fewer than [`MIN_CONTROL_FRAME_SIZE`] bytes
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < MIN_CONTROL_FRAME_SIZE {
            return Err(CommandError::FrameTooShort {
                expected: MIN_CONTROL_FRAME_SIZE,
                actual: bytes.len(),
            });
        }

        let (header_bytes, body) = bytes.split_at(TIMESTAMP_SIZE);
        let Ok(header) = <[u8; TIMESTAMP_SIZE]>::try_from(header_bytes) else {
            unreachable!("split_at yields exactly TIMESTAMP_SIZE header bytes");
        };

        Ok(Self { timestamp: u64::from_be_bytes(header), header, body })
    }

    /// Header bytes for a timestamp.
    pub fn header_for(timestamp: u64) -> [u8; TIMESTAMP_SIZE] {
        timestamp.to_be_bytes()
    }

    /// Write `header ‖ body` into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_slice(&self.header);
        dst.put_slice(self.body);
    }

    /// Prepend the timestamp header to a sealed body.
    pub fn join(timestamp: u64, body: &[u8]) -> Vec<u8> {
        let frame = ControlFrame { timestamp, header: Self::header_for(timestamp), body };
        let mut out = Vec::with_capacity(TIMESTAMP_SIZE + body.len());
        frame.encode(&mut out);
        out
    }
}
