//! E4 Protocol Wire Format
//!
//! Binary encoding of administrative commands and the framing of protected
//! control traffic.
//!
//! # Command Layout
//!
//! ```text
//! ┌─────────┬──────────────────────────────┐
//! │ tag (1) │ variant payload (0, 32 or 64) │
//! └─────────┴──────────────────────────────┘
//! ```
//!
//! Tags are a closed, version-stable enumeration ([`CommandTag`]). Decoding is
//! strict: an unknown tag or a payload of the wrong length is rejected before
//! any field is interpreted.
//!
//! # Protected Command Layout
//!
//! ```text
//! ┌───────────────┬──────────────┬─────────────────────┬────────────┐
//! │ timestamp (8) │ nonce (24)   │ encrypted command   │ tag (16)   │
//! └───────────────┴──────────────┴─────────────────────┴────────────┘
//! ```
//!
//! The timestamp is big-endian Unix seconds and is authenticated as associated
//! data. See [`ControlFrame`].
//!
//! # Control Topics
//!
//! Each client listens on `e4/<hex(SHA-256(client id))>`; see
//! [`control_topic_path`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod envelope;
pub mod errors;
pub mod topic;

pub use command::{Command, CommandTag};
pub use envelope::{ControlFrame, MIN_CONTROL_FRAME_SIZE, TIMESTAMP_SIZE};
pub use errors::{CommandError, Result};
pub use topic::{CONTROL_TOPIC_PREFIX, control_topic_path, topic_identifier};
