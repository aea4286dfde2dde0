//! Property-based tests for the command codec
//!
//! Verifies the codec for all commands, not just hand-picked examples:
//!
//! 1. **Round-trip**: decode(encode(c)) == c
//! 2. **Strictness**: every byte string either decodes to a command whose
//!    encoding is that exact string, or is rejected
//! 3. **Stability**: fixed wire vectors for shipped tags

use e4_crypto::{Identifier, SymmetricKey, derive_identifier};
use e4_proto::{Command, CommandError, CommandTag, ControlFrame};
use proptest::prelude::*;

fn arbitrary_id() -> impl Strategy<Value = Identifier> {
    any::<[u8; 32]>().prop_map(Identifier::from_bytes)
}

fn arbitrary_key() -> impl Strategy<Value = SymmetricKey> {
    any::<[u8; 32]>().prop_map(SymmetricKey::from_bytes)
}

/// Strategy for generating arbitrary commands of every variant
fn arbitrary_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        arbitrary_id().prop_map(|topic| Command::RemoveTopicKey { topic }),
        Just(Command::ResetTopicKeys),
        arbitrary_key().prop_map(|key| Command::SetIdKey { key }),
        (arbitrary_key(), arbitrary_id()).prop_map(|(key, topic)| Command::SetTopicKey { key, topic }),
        arbitrary_id().prop_map(|name| Command::RemovePubKey { name }),
        Just(Command::ResetPubKeys),
        (any::<[u8; 32]>(), arbitrary_id())
            .prop_map(|(public_key, name)| Command::SetPubKey { public_key, name }),
        any::<[u8; 32]>().prop_map(|public_key| Command::SetC2Key { public_key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_command_roundtrip(cmd in arbitrary_command()) {
        let encoded = cmd.to_vec();
        prop_assert_eq!(encoded.len(), cmd.encoded_len());
        prop_assert_eq!(Command::decode(&encoded)?, cmd);
    }

    #[test]
    fn prop_decode_is_strict(bytes in prop::collection::vec(any::<u8>(), 0..80)) {
        match Command::decode(&bytes) {
            Ok(cmd) => prop_assert_eq!(cmd.to_vec(), bytes),
            Err(CommandError::UnknownCommand(tag)) => {
                prop_assert_eq!(Some(&tag), bytes.first());
                prop_assert!(CommandTag::from_u8(tag).is_none());
            },
            Err(CommandError::MalformedCommand { expected, actual }) => {
                prop_assert_eq!(actual, bytes.len());
                prop_assert_ne!(expected, actual);
            },
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn prop_truncated_command_is_malformed(cmd in arbitrary_command(), keep in any::<usize>()) {
        let encoded = cmd.to_vec();
        let keep = keep % encoded.len();

        let result = Command::decode(&encoded[..keep]);
        let is_malformed = matches!(result, Err(CommandError::MalformedCommand { .. }));
        prop_assert!(is_malformed);
    }

    #[test]
    fn prop_control_frame_preserves_timestamp(
        timestamp in any::<u64>(),
        body in prop::collection::vec(any::<u8>(), 40..128),
    ) {
        let frame = ControlFrame::join(timestamp, &body);
        let parsed = ControlFrame::parse(&frame)?;

        prop_assert_eq!(parsed.timestamp, timestamp);
        prop_assert_eq!(parsed.body, &body[..]);
    }
}

#[test]
fn set_topic_key_wire_vector() {
    let cmd = Command::SetTopicKey {
        key: SymmetricKey::from_bytes([0x11; 32]),
        topic: Identifier::from_bytes([0x22; 32]),
    };
    insta::assert_snapshot!(hex::encode(cmd.to_vec()), @"0311111111111111111111111111111111111111111111111111111111111111112222222222222222222222222222222222222222222222222222222222222222");
}

#[test]
fn set_pub_key_wire_vector() {
    let cmd = Command::SetPubKey { public_key: [0xAB; 32], name: derive_identifier("alice") };
    insta::assert_snapshot!(hex::encode(cmd.to_vec()), @"06abababababababababababababababababababababababababababababababab2bd806c97f0e00af1a1fc3328fa763a9269723c8db8fac4f93af71db186d6e90");
}

#[test]
fn remove_topic_key_wire_vector() {
    let cmd = Command::remove_topic_key("/demo/alice/messages");
    insta::assert_snapshot!(hex::encode(cmd.to_vec()), @"0090c9cbb7745b916cbaf72cf0d2b40825057d33647e5a4037f17a2d90c413198b");
}

#[test]
fn reset_commands_are_single_bytes() {
    assert_eq!(Command::ResetTopicKeys.to_vec(), vec![0x01]);
    assert_eq!(Command::ResetPubKeys.to_vec(), vec![0x05]);
}

#[test]
fn unassigned_tag_0xff_is_unknown() {
    assert_eq!(Command::decode(&[0xFF]), Err(CommandError::UnknownCommand(0xFF)));
    assert_eq!(Command::decode(&[0xFF; 65]), Err(CommandError::UnknownCommand(0xFF)));
}
