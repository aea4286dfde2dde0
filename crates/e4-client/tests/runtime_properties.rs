//! Property-based tests for the client runtime
//!
//! These tests verify the invariants of command processing:
//!
//! 1. **Atomicity**: a rejected control frame leaves every store entry as it
//!    was (snapshot equality before and after)
//! 2. **Tamper rejection**: flipping any bit of a protected command fails
//! 3. **Key isolation**: holding keys for other topics never helps
//! 4. **Survival**: the runtime keeps working after arbitrary hostile input

use e4_client::{
    ClientConfig, ClientError, ClientRuntime, ClientTarget, CommandIssuer, Environment,
    IdentityKey, KeyStore, MemoryKeyStore,
};
use e4_crypto::{SymmetricKey, derive_identifier};
use e4_proto::Command;
use proptest::prelude::*;

const NOW: u64 = 1_700_000_000;

// Deterministic environment: counter-based bytes, fixed clock
#[derive(Clone)]
struct TestEnv {
    fill: u8,
}

impl Environment for TestEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.fill.wrapping_add(i as u8);
        }
    }

    fn wall_clock_secs(&self) -> u64 {
        NOW
    }
}

fn alice_key() -> SymmetricKey {
    SymmetricKey::from_bytes([0xA1; 32])
}

fn alice_target() -> ClientTarget {
    ClientTarget::Symmetric { client_id: derive_identifier("alice"), key: alice_key() }
}

/// Runtime pre-loaded with two topic keys so rejections have state to corrupt.
fn seeded_runtime() -> ClientRuntime<MemoryKeyStore, TestEnv> {
    let store = MemoryKeyStore::with_identity(IdentityKey::Symmetric(alice_key()));
    store.set_topic_key(derive_identifier("/one"), SymmetricKey::from_bytes([1; 32])).unwrap();
    store.set_topic_key(derive_identifier("/two"), SymmetricKey::from_bytes([2; 32])).unwrap();

    let env = TestEnv { fill: 0 };
    ClientRuntime::new(derive_identifier("alice"), store, env, ClientConfig::default()).unwrap()
}

fn arbitrary_symmetric_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        "/[a-z]{1,12}".prop_map(|topic| Command::remove_topic_key(&topic)),
        Just(Command::ResetTopicKeys),
        (any::<[u8; 32]>(), "/[a-z]{1,12}")
            .prop_map(|(key, topic)| Command::set_topic_key(SymmetricKey::from_bytes(key), &topic)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_garbage_leaves_store_unchanged(bytes in prop::collection::vec(any::<u8>(), 0..200)) {
        let runtime = seeded_runtime();
        let before = runtime.store().snapshot()?;

        let result = runtime.receive_control(&bytes);

        prop_assert!(result.is_err());
        prop_assert_eq!(runtime.store().snapshot()?, before);
    }

    #[test]
    fn prop_bit_flip_is_rejected_atomically(
        command in arbitrary_symmetric_command(),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
        fill in any::<u8>(),
    ) {
        let runtime = seeded_runtime();
        let issuer = CommandIssuer::generate(TestEnv { fill });
        let mut frame = issuer.protect(&command, &alice_target())?.payload;

        let index = position.index(frame.len());
        frame[index] ^= 1 << bit;

        let before = runtime.store().snapshot()?;
        let result = runtime.receive_control(&frame);

        // The timestamp is authenticated data, so every flip fails before freshness
        let rejected = matches!(result, Err(ClientError::Crypto(_)));
        prop_assert!(rejected, "flip at byte {} bit {} gave {:?}", index, bit, result);
        prop_assert_eq!(runtime.store().snapshot()?, before);
    }

    #[test]
    fn prop_authentic_commands_apply(command in arbitrary_symmetric_command(), fill in any::<u8>()) {
        let runtime = seeded_runtime();
        let issuer = CommandIssuer::generate(TestEnv { fill });
        let frame = issuer.protect(&command, &alice_target())?.payload;

        prop_assert_eq!(runtime.receive_control(&frame)?, command);
    }

    #[test]
    fn prop_key_isolation(topic in "/[a-z]{1,12}", other in "/[a-z]{1,12}") {
        prop_assume!(topic != other);

        let runtime = seeded_runtime();
        let issuer = CommandIssuer::generate(TestEnv { fill: 9 });
        let set = Command::set_topic_key(SymmetricKey::from_bytes([0x42; 32]), &other);
        runtime.receive_control(&issuer.protect(&set, &alice_target())?.payload)?;

        let is_missing = |result: Result<Vec<u8>, ClientError>| {
            matches!(result, Err(ClientError::KeyNotFound { .. }))
        };
        let holds_key = runtime.store().topic_key(&derive_identifier(&topic))?.is_some();

        prop_assert_eq!(is_missing(runtime.protect_message(b"x", &topic)), !holds_key);
        prop_assert_eq!(is_missing(runtime.unprotect_message(&[0u8; 64], &topic)), !holds_key);
    }
}

#[test]
fn runtime_survives_hostile_flood() {
    let runtime = seeded_runtime();
    let issuer = CommandIssuer::generate(TestEnv { fill: 3 });

    for len in 0..512usize {
        let garbage: Vec<u8> = (0..len).map(|i| (i * 31 + len) as u8).collect();
        let err = runtime.receive_control(&garbage).unwrap_err();
        assert!(!err.is_fatal());
    }

    let command = Command::set_topic_key(SymmetricKey::from_bytes([7; 32]), "/after");
    let frame = issuer.protect(&command, &alice_target()).unwrap().payload;
    assert_eq!(runtime.receive_control(&frame).unwrap(), command);
}

#[test]
fn replayed_command_is_idempotent() {
    let runtime = seeded_runtime();
    let issuer = CommandIssuer::generate(TestEnv { fill: 5 });
    let command = Command::set_topic_key(SymmetricKey::from_bytes([8; 32]), "/replayed");
    let frame = issuer.protect(&command, &alice_target()).unwrap().payload;

    runtime.receive_control(&frame).unwrap();
    let once = runtime.store().snapshot().unwrap();

    runtime.receive_control(&frame).unwrap();
    assert_eq!(runtime.store().snapshot().unwrap(), once);
}
