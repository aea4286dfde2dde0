//! Fuzz target for the client control pipeline (parse -> open -> freshness ->
//! decode -> apply)
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary data straight into `receive_control`
//! - Authentic commands: arbitrary plaintext protected under the client key
//! - Tampered commands: authentic frames with one bit flipped
//! - Clock games: authentic frames stamped at arbitrary times
//!
//! # Invariants
//!
//! - The pipeline never panics
//! - A rejected frame leaves the key store exactly as it was
//! - Only authentic, fresh, well-formed plaintext is ever applied

#![no_main]

use arbitrary::Arbitrary;
use e4_client::{
    ClientConfig, ClientRuntime, Environment, IdentityKey, KeyStore, MemoryKeyStore,
};
use e4_crypto::{SymmetricKey, derive_identifier, encrypt_with_aad};
use e4_proto::ControlFrame;
use libfuzzer_sys::fuzz_target;

const NOW: u64 = 1_700_000_000;

#[derive(Clone)]
struct FuzzEnv;

impl Environment for FuzzEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(0x42);
    }

    fn wall_clock_secs(&self) -> u64 {
        NOW
    }
}

#[derive(Debug, Arbitrary)]
enum FrameInput {
    Raw(Vec<u8>),
    Authentic { plaintext: Vec<u8>, age: i16 },
    Tampered { plaintext: Vec<u8>, position: u16, bit: u8 },
}

fn protect(key: &SymmetricKey, plaintext: &[u8], timestamp: u64) -> Vec<u8> {
    let header = ControlFrame::header_for(timestamp);
    let body = encrypt_with_aad(plaintext, &header, key, [7; 24]);
    ControlFrame::join(timestamp, &body)
}

fuzz_target!(|inputs: Vec<FrameInput>| {
    let key = SymmetricKey::from_bytes([0x5E; 32]);
    let Ok(runtime) = ClientRuntime::provision(
        derive_identifier("fuzz"),
        IdentityKey::Symmetric(key.clone()),
        MemoryKeyStore::new(),
        FuzzEnv,
        ClientConfig::default(),
    ) else {
        return;
    };

    for input in inputs.iter().take(64) {
        let frame = match input {
            FrameInput::Raw(bytes) => bytes.clone(),
            FrameInput::Authentic { plaintext, age } => {
                protect(&key, plaintext, NOW.saturating_add_signed(i64::from(*age)))
            },
            FrameInput::Tampered { plaintext, position, bit } => {
                let mut frame = protect(&key, plaintext, NOW);
                let index = usize::from(*position) % frame.len();
                frame[index] ^= 1 << (bit % 8);
                frame
            },
        };

        let Ok(before) = runtime.store().snapshot() else {
            return;
        };
        let result = runtime.receive_control(&frame);
        let Ok(after) = runtime.store().snapshot() else {
            return;
        };

        match (input, result) {
            (_, Err(_)) => assert_eq!(before, after, "rejected frame changed the store"),
            (FrameInput::Raw(_) | FrameInput::Tampered { .. }, Ok(command)) => {
                panic!("unauthenticated frame applied: {command:?}")
            },
            (FrameInput::Authentic { .. }, Ok(_)) => {},
        }
    }
});
