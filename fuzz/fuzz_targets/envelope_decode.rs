//! Fuzz target for envelope decoding
//!
//! Feeds arbitrary bytes to both frame decoders to find:
//! - Parser crashes or panics
//! - Pathological JSON that bypasses the tagged-enum validation
//!
//! The decoders should NEVER panic. All invalid inputs must return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spotline_proto::{ClientFrame, ServerFrame};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Invalid envelopes must come back as Err, never panic.
        let _ = ServerFrame::decode(text);
        let _ = ClientFrame::decode(text);
    }
});
