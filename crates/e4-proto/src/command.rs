//! Administrative commands and their binary encoding.
//!
//! A command is one tag byte followed by a fixed-size payload determined by
//! the tag. There are no variable-length fields, so a command's total length is
//! known from its first byte.

use bytes::BufMut;
use e4_crypto::{
    ID_SIZE, Identifier, KEY_SIZE, PUBLIC_KEY_SIZE, SymmetricKey, VerifyingKey, X25519PublicKey,
    derive_identifier,
};

use crate::errors::{CommandError, Result};

/// Command tag byte.
///
/// Values are part of the wire contract and are never renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandTag {
    /// Remove the key for one topic
    RemoveTopicKey = 0x00,
    /// Remove every topic key
    ResetTopicKeys = 0x01,
    /// Replace the client's identity key
    SetIdKey = 0x02,
    /// Install or replace a topic key
    SetTopicKey = 0x03,
    /// Remove one peer public key
    RemovePubKey = 0x04,
    /// Remove every peer public key
    ResetPubKeys = 0x05,
    /// Install or replace a peer public key
    SetPubKey = 0x06,
    /// Replace the administrator's public key
    SetC2Key = 0x07,
}

impl CommandTag {
    /// Every tag, in wire order.
    pub const ALL: [Self; 8] = [
        Self::RemoveTopicKey,
        Self::ResetTopicKeys,
        Self::SetIdKey,
        Self::SetTopicKey,
        Self::RemovePubKey,
        Self::ResetPubKeys,
        Self::SetPubKey,
        Self::SetC2Key,
    ];

    /// Parse a tag byte. `None` if unassigned.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::RemoveTopicKey),
            0x01 => Some(Self::ResetTopicKeys),
            0x02 => Some(Self::SetIdKey),
            0x03 => Some(Self::SetTopicKey),
            0x04 => Some(Self::RemovePubKey),
            0x05 => Some(Self::ResetPubKeys),
            0x06 => Some(Self::SetPubKey),
            0x07 => Some(Self::SetC2Key),
            _ => None,
        }
    }

    /// Tag as its wire byte.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Payload length that follows the tag byte.
    pub fn payload_len(self) -> usize {
        match self {
            Self::ResetTopicKeys | Self::ResetPubKeys => 0,
            Self::RemoveTopicKey | Self::RemovePubKey => ID_SIZE,
            Self::SetIdKey => KEY_SIZE,
            Self::SetC2Key => PUBLIC_KEY_SIZE,
            Self::SetTopicKey => KEY_SIZE + ID_SIZE,
            Self::SetPubKey => PUBLIC_KEY_SIZE + ID_SIZE,
        }
    }

    /// Whether only public-key clients accept this command.
    pub fn requires_public_key_identity(self) -> bool {
        matches!(self, Self::RemovePubKey | Self::ResetPubKeys | Self::SetPubKey | Self::SetC2Key)
    }

    /// Human-readable name, for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::RemoveTopicKey => "RemoveTopicKey",
            Self::ResetTopicKeys => "ResetTopicKeys",
            Self::SetIdKey => "SetIdKey",
            Self::SetTopicKey => "SetTopicKey",
            Self::RemovePubKey => "RemovePubKey",
            Self::ResetPubKeys => "ResetPubKeys",
            Self::SetPubKey => "SetPubKey",
            Self::SetC2Key => "SetC2Key",
        }
    }
}

/// Administrative command addressed to one client.
///
/// Public keys are carried as raw bytes. The codec checks lengths only; curve
/// validation happens when the command is applied, so a structurally valid
/// command with an invalid key is distinguishable from a malformed one.
///
/// # Invariants
///
/// - Round-trip: `Command::decode(&cmd.to_vec()) == Ok(cmd)` for every command
/// - Fixed size: `cmd.to_vec().len() == 1 + cmd.tag().payload_len()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Remove the key for `topic`. Removing an absent key is a no-op.
    RemoveTopicKey {
        /// Topic identifier
        topic: Identifier,
    },
    /// Remove every topic key.
    ResetTopicKeys,
    /// Replace the identity key.
    ///
    /// Symmetric clients take `key` as their new identity key; public-key
    /// clients take it as a new Ed25519 seed.
    SetIdKey {
        /// New key material
        key: SymmetricKey,
    },
    /// Install `key` for `topic`, replacing any previous key.
    SetTopicKey {
        /// Topic key
        key: SymmetricKey,
        /// Topic identifier
        topic: Identifier,
    },
    /// Remove the public key stored under `name`.
    RemovePubKey {
        /// Peer name identifier
        name: Identifier,
    },
    /// Remove every peer public key.
    ResetPubKeys,
    /// Store an Ed25519 public key under `name`.
    SetPubKey {
        /// Encoded Ed25519 public key
        public_key: [u8; PUBLIC_KEY_SIZE],
        /// Peer name identifier
        name: Identifier,
    },
    /// Replace the administrator's X25519 public key.
    SetC2Key {
        /// Encoded X25519 public key
        public_key: [u8; PUBLIC_KEY_SIZE],
    },
}

impl Command {
    /// `SetTopicKey` for a human-readable topic path.
    pub fn set_topic_key(key: SymmetricKey, topic: &str) -> Self {
        Self::SetTopicKey { key, topic: derive_identifier(topic) }
    }

    /// `RemoveTopicKey` for a human-readable topic path.
    pub fn remove_topic_key(topic: &str) -> Self {
        Self::RemoveTopicKey { topic: derive_identifier(topic) }
    }

    /// `SetPubKey` for a human-readable peer name.
    pub fn set_pub_key(public_key: &VerifyingKey, name: &str) -> Self {
        Self::SetPubKey { public_key: public_key.to_bytes(), name: derive_identifier(name) }
    }

    /// `RemovePubKey` for a human-readable peer name.
    pub fn remove_pub_key(name: &str) -> Self {
        Self::RemovePubKey { name: derive_identifier(name) }
    }

    /// `SetC2Key` for an administrator public key.
    pub fn set_c2_key(public_key: &X25519PublicKey) -> Self {
        Self::SetC2Key { public_key: public_key.to_bytes() }
    }

    /// Tag for this command.
    pub fn tag(&self) -> CommandTag {
        match self {
            Self::RemoveTopicKey { .. } => CommandTag::RemoveTopicKey,
            Self::ResetTopicKeys => CommandTag::ResetTopicKeys,
            Self::SetIdKey { .. } => CommandTag::SetIdKey,
            Self::SetTopicKey { .. } => CommandTag::SetTopicKey,
            Self::RemovePubKey { .. } => CommandTag::RemovePubKey,
            Self::ResetPubKeys => CommandTag::ResetPubKeys,
            Self::SetPubKey { .. } => CommandTag::SetPubKey,
            Self::SetC2Key { .. } => CommandTag::SetC2Key,
        }
    }

    /// Encoded length, including the tag byte.
    pub fn encoded_len(&self) -> usize {
        1 + self.tag().payload_len()
    }

    /// Write the wire encoding into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.tag().to_u8());

        match self {
            Self::ResetTopicKeys | Self::ResetPubKeys => {},
            Self::RemoveTopicKey { topic } => dst.put_slice(topic.as_bytes()),
            Self::RemovePubKey { name } => dst.put_slice(name.as_bytes()),
            Self::SetIdKey { key } => dst.put_slice(key.as_bytes()),
            Self::SetTopicKey { key, topic } => {
                dst.put_slice(key.as_bytes());
                dst.put_slice(topic.as_bytes());
            },
            Self::SetPubKey { public_key, name } => {
                dst.put_slice(public_key);
                dst.put_slice(name.as_bytes());
            },
            Self::SetC2Key { public_key } => dst.put_slice(public_key),
        }
    }

    /// Wire encoding as a fresh buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode(&mut out);
        debug_assert_eq!(out.len(), self.encoded_len());
        out
    }

    /// Decode a command.
    ///
    /// # Errors
    ///
    /// - `MalformedCommand` if `bytes` is empty or its length does not match
    ///   the tag
    /// - `UnknownCommand` if the tag byte is unassigned
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some((&tag_byte, payload)) = bytes.split_first() else {
            return Err(CommandError::MalformedCommand { expected: 1, actual: 0 });
        };

        let tag = CommandTag::from_u8(tag_byte).ok_or(CommandError::UnknownCommand(tag_byte))?;

        let expected = 1 + tag.payload_len();
        if bytes.len() != expected {
            return Err(CommandError::MalformedCommand { expected, actual: bytes.len() });
        }

        let command = match tag {
            CommandTag::RemoveTopicKey => Self::RemoveTopicKey { topic: read_id(payload, 0) },
            CommandTag::ResetTopicKeys => Self::ResetTopicKeys,
            CommandTag::SetIdKey => {
                Self::SetIdKey { key: SymmetricKey::from_bytes(read_array(payload, 0)) }
            },
            CommandTag::SetTopicKey => Self::SetTopicKey {
                key: SymmetricKey::from_bytes(read_array(payload, 0)),
                topic: read_id(payload, KEY_SIZE),
            },
            CommandTag::RemovePubKey => Self::RemovePubKey { name: read_id(payload, 0) },
            CommandTag::ResetPubKeys => Self::ResetPubKeys,
            CommandTag::SetPubKey => Self::SetPubKey {
                public_key: read_array(payload, 0),
                name: read_id(payload, PUBLIC_KEY_SIZE),
            },
            CommandTag::SetC2Key => Self::SetC2Key { public_key: read_array(payload, 0) },
        };

        Ok(command)
    }
}

// Callers have already checked the payload length against the tag
fn read_array(payload: &[u8], offset: usize) -> [u8; 32] {
    let Some(Ok(array)) = payload.get(offset..offset + 32).map(<[u8; 32]>::try_from) else {
        unreachable!("payload length checked against tag before field access");
    };
    array
}

fn read_id(payload: &[u8], offset: usize) -> Identifier {
    Identifier::from_bytes(read_array(payload, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_byte_roundtrip() {
        for tag in CommandTag::ALL {
            assert_eq!(CommandTag::from_u8(tag.to_u8()), Some(tag));
        }
        for byte in 0x08..=0xFF {
            assert_eq!(CommandTag::from_u8(byte), None);
        }
    }

    #[test]
    fn tag_values_are_stable() {
        let bytes: Vec<u8> = CommandTag::ALL.iter().map(|t| t.to_u8()).collect();
        assert_eq!(bytes, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn set_topic_key_layout_is_key_then_topic() {
        let cmd = Command::SetTopicKey {
            key: SymmetricKey::from_bytes([0x11; 32]),
            topic: Identifier::from_bytes([0x22; 32]),
        };
        let encoded = cmd.to_vec();

        assert_eq!(encoded.len(), 65);
        assert_eq!(encoded[0], 0x03);
        assert_eq!(&encoded[1..33], &[0x11; 32]);
        assert_eq!(&encoded[33..], &[0x22; 32]);
    }

    #[test]
    fn decode_roundtrip_every_variant() {
        let commands = [
            Command::remove_topic_key("/a"),
            Command::ResetTopicKeys,
            Command::SetIdKey { key: SymmetricKey::from_bytes([3; 32]) },
            Command::set_topic_key(SymmetricKey::from_bytes([4; 32]), "/b"),
            Command::remove_pub_key("carol"),
            Command::ResetPubKeys,
            Command::SetPubKey { public_key: [6; 32], name: derive_identifier("dave") },
            Command::SetC2Key { public_key: [7; 32] },
        ];

        for cmd in commands {
            assert_eq!(Command::decode(&cmd.to_vec()), Ok(cmd.clone()), "{}", cmd.tag().name());
        }
    }

    #[test]
    fn empty_input_is_malformed() {
        assert_eq!(
            Command::decode(&[]),
            Err(CommandError::MalformedCommand { expected: 1, actual: 0 })
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(Command::decode(&[0xFF]), Err(CommandError::UnknownCommand(0xFF)));
        assert_eq!(Command::decode(&[0x08; 33]), Err(CommandError::UnknownCommand(0x08)));
    }

    #[test]
    fn length_mismatch_is_malformed() {
        assert_eq!(
            Command::decode(&[0x00; 32]),
            Err(CommandError::MalformedCommand { expected: 33, actual: 32 })
        );
        assert_eq!(
            Command::decode(&[0x01, 0x00]),
            Err(CommandError::MalformedCommand { expected: 1, actual: 2 })
        );
        assert_eq!(
            Command::decode(&[0x03; 66]),
            Err(CommandError::MalformedCommand { expected: 65, actual: 66 })
        );
    }

    #[test]
    fn pubkey_only_tags() {
        let restricted: Vec<_> =
            CommandTag::ALL.into_iter().filter(|t| t.requires_public_key_identity()).collect();
        assert_eq!(
            restricted,
            vec![
                CommandTag::RemovePubKey,
                CommandTag::ResetPubKeys,
                CommandTag::SetPubKey,
                CommandTag::SetC2Key
            ]
        );
    }
}
