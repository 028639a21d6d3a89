//! Fuzz target for the line framer.
//!
//! Splits arbitrary bytes into arbitrary chunks and runs them through
//! the codec; framing must never panic, and non-UTF-8 lines must
//! degrade rather than abort.

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16384 {
        return;
    }

    let mut codec = slirc_session::LineCodec::new();
    let mut buf = BytesMut::new();

    for chunk in data.chunks(7) {
        buf.extend_from_slice(chunk);
        loop {
            match codec.decode(&mut buf) {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                // Oversized-line errors are expected for long inputs
                Err(_) => return,
            }
        }
    }
});
