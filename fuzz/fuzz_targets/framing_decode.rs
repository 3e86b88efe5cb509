//! Fuzz target for the frame header codec.
//!
//! Decoding arbitrary bytes must never panic; invalid headers return
//! structured errors. Valid decodes must re-encode to the same bytes.

#![no_main]

use driftlog_proto::Framing;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < Framing::SIZE {
        return;
    }
    let mut buf = [0u8; Framing::SIZE];
    buf.copy_from_slice(&data[..Framing::SIZE]);

    if let Ok(framing) = Framing::decode(&buf) {
        assert_eq!(framing.encode(), buf);
    }
});
