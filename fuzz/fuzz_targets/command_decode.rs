//! Fuzz target for Command::decode and ControlFrame::parse
//!
//! # Invariants
//!
//! - Decoding arbitrary bytes never panics
//! - A successful decode consumed exactly the input: re-encoding yields the
//!   same bytes
//! - Frame parsing either fails on short input or splits it losslessly

#![no_main]

use e4_proto::{Command, ControlFrame, MIN_CONTROL_FRAME_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(command) = Command::decode(data) {
        assert_eq!(command.to_vec(), data, "decode accepted bytes it would not produce");
        assert_eq!(command.encoded_len(), data.len());
    }

    match ControlFrame::parse(data) {
        Ok(frame) => {
            assert!(data.len() >= MIN_CONTROL_FRAME_SIZE);
            assert_eq!(ControlFrame::join(frame.timestamp, frame.body), data);
        },
        Err(_) => assert!(data.len() < MIN_CONTROL_FRAME_SIZE),
    }
});
