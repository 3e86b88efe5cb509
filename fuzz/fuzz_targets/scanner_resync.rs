//! Fuzz target for scanner resynchronization.
//!
//! Scanning arbitrary byte streams must terminate without panicking,
//! whatever mix of garbage, partial markers, and truncated frames the
//! input contains.

#![no_main]

use driftlog_core::{Scan, Scanner};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut scanner = Scanner::new(data);
    let mut sink = Vec::new();

    for _ in 0..64 {
        if scanner.peek_envelope().is_none() {
            break;
        }
        if scanner.copy_frame(&mut sink).is_err() {
            break;
        }
        sink.clear();
    }
});
