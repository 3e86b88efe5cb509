//! Fuzz target for the envelope codec.
//!
//! Arbitrary bytes must decode to a structured error or a well-formed
//! envelope, never a panic; well-formed envelopes must roundtrip.

#![no_main]

use driftlog_proto::Envelope;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(envelope) = Envelope::read(&mut &data[..], data.len()) {
        let mut wire = Vec::new();
        let nwritten = envelope.write(&mut wire).expect("reserialize");
        let decoded = Envelope::read(&mut wire.as_slice(), nwritten).expect("reparse");
        assert_eq!(decoded, envelope);
    }
});
