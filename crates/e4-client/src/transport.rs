//! Transport contract.
//!
//! The runtime never performs I/O. A driver feeds received messages in as
//! [`ClientEvent::MessageReceived`](crate::ClientEvent::MessageReceived) and
//! executes [`ClientAction::Publish`](crate::ClientAction::Publish) through a
//! [`Transport`].

use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Broker or connection is gone.
    #[error("transport disconnected: {0}")]
    Disconnected(String),

    /// Topic path rejected by the transport.
    #[error("invalid topic {0:?}")]
    InvalidTopic(String),
}

/// Publish/subscribe transport.
///
/// Topics are opaque path-like strings. Delivery is the transport's concern:
/// whatever it receives on a subscribed topic goes back into the runtime as a
/// `MessageReceived` event.
pub trait Transport {
    /// Publish `payload` on `topic`.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Start receiving messages published on `topic`.
    fn subscribe(&self, topic: &str) -> Result<(), TransportError>;
}
