//! Client events and actions.

use e4_proto::CommandTag;

/// Events the caller feeds into the runtime.
///
/// The caller is responsible for:
/// - Receiving messages from the transport
/// - Forwarding application intents (publish a message)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Message delivered by the transport.
    ///
    /// Payloads on the client's control topic are treated as commands; all
    /// others as protected application messages.
    MessageReceived {
        /// Transport topic path
        topic: String,
        /// Raw payload
        payload: Vec<u8>,
    },

    /// Application wants to publish a message.
    PublishMessage {
        /// Transport topic path
        topic: String,
        /// Message plaintext
        plaintext: Vec<u8>,
    },
}

/// Actions the runtime produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Publish bytes on the transport.
    Publish {
        /// Transport topic path
        topic: String,
        /// Protected payload
        payload: Vec<u8>,
    },

    /// Deliver a decrypted message to the application.
    DeliverMessage {
        /// Transport topic path
        topic: String,
        /// Decrypted plaintext
        plaintext: Vec<u8>,
    },

    /// A control command was authenticated and applied to the key store.
    CommandApplied {
        /// Which command
        command: CommandTag,
    },
}
