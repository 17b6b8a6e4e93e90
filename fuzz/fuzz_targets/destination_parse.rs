//! Fuzz target for the destination grammar
//!
//! Destinations arrive on every inbound frame and are parsed before routing.
//! The parser must reject anything outside the subscribe-form grammar
//! without panicking, and accepted paths must round-trip through rendering.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spotline_proto::Destination;

fuzz_target!(|data: &[u8]| {
    if let Ok(path) = std::str::from_utf8(data) {
        if let Ok(dest) = Destination::parse(path) {
            // Accepted paths re-render to a parseable equal destination.
            let rendered = dest.subscribe_path();
            let reparsed = Destination::parse(&rendered).expect("rendered path must parse");
            assert_eq!(reparsed, dest);
        }
    }
});
