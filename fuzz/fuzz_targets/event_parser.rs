//! Fuzz target for event parsing.
//!
//! Feeds randomly generated lines to the parser and ensures it never
//! panics: the parser is deliberately lenient, so any input must yield
//! either a best-effort event or nothing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        // Skip empty inputs and very long inputs (over 512 bytes is unusual for IRC)
        if input.is_empty() || input.len() > 512 {
            return;
        }

        // Event parsing - should never panic
        let _ = slirc_session::Event::parse(input);

        // Source splitting - should never panic
        let _ = slirc_session::Source::parse(input);
    }
});
