//! Fuzz target for frame body payloads
//!
//! Chat and enter bodies are JSON documents parsed from untrusted frame
//! bodies; a malformed body must be reported as an error and never panic.
//! Decoded bodies are re-rendered to check the encoder handles whatever
//! content the decoder accepted.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spotline_proto::{ChatBody, EnterBody};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = ChatBody::parse(text);

        if let Ok(enter) = EnterBody::parse(text) {
            // Whatever parsed must render back without panicking.
            let _ = enter.render();
        }
    }
});
