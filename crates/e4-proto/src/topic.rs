//! Mapping between identifiers and transport topic paths.
//!
//! Data topics are addressed by their human-readable path on the transport and
//! by `SHA-256(path)` inside key stores. Control topics are derived from the
//! client identifier and rendered as lowercase hex so they are valid routing
//! keys on any broker.

use e4_crypto::{Identifier, control_channel, derive_identifier};

/// Prefix of every control topic path.
pub const CONTROL_TOPIC_PREFIX: &str = "e4/";

/// Transport path of a client's control topic: `e4/` ‖ hex(SHA-256(id)).
pub fn control_topic_path(client_id: &Identifier) -> String {
    format!("{CONTROL_TOPIC_PREFIX}{}", control_channel(client_id).to_hex())
}

/// Key-store identifier for a data topic path.
pub fn topic_identifier(path: &str) -> Identifier {
    derive_identifier(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_path_for_alice() {
        let alice = derive_identifier("alice");
        assert_eq!(
            control_topic_path(&alice),
            "e4/bd306425d873dc3e9fd1520e693954d6d605e8ad2fae4e48f53a395526f39abe"
        );
    }

    #[test]
    fn control_path_is_not_a_data_topic_hash() {
        let alice = derive_identifier("alice");
        let path = control_topic_path(&alice);
        assert!(path.starts_with(CONTROL_TOPIC_PREFIX));
        assert_eq!(path.len(), CONTROL_TOPIC_PREFIX.len() + 64);
        assert_ne!(path[CONTROL_TOPIC_PREFIX.len()..], alice.to_hex());
    }
}
