//! Property-based tests for line framing.
//!
//! The framer must be chunk-boundary independent: feeding a byte stream
//! in arbitrary slices yields exactly the line sequence of feeding it
//! whole. proptest generates random line batches and random cut points,
//! including cuts in the middle of the CRLF terminator.

use bytes::BytesMut;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

use slirc_session::LineCodec;

/// Run a byte stream through the codec in the given chunks, collecting
/// every completed line.
fn decode_chunked(chunks: &[&[u8]]) -> Vec<String> {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::new();
    let mut lines = Vec::new();

    for chunk in chunks {
        buf.extend_from_slice(chunk);
        while let Some(line) = codec.decode(&mut buf).expect("framing never fails on text") {
            lines.push(line);
        }
    }
    lines
}

fn decode_whole(bytes: &[u8]) -> Vec<String> {
    decode_chunked(&[bytes])
}

/// Split `bytes` at pseudo-random boundaries driven by `sizes`.
fn split_by_sizes<'a>(bytes: &'a [u8], sizes: &[usize]) -> Vec<&'a [u8]> {
    let mut chunks = Vec::new();
    let mut rest = bytes;
    let mut i = 0;
    while !rest.is_empty() {
        let take = sizes.get(i).copied().unwrap_or(3).clamp(1, rest.len());
        let (head, tail) = rest.split_at(take);
        chunks.push(head);
        rest = tail;
        i += 1;
    }
    chunks
}

/// Line content: printable, no CR/LF/NUL.
fn line_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~]{0,80}").expect("valid regex")
}

proptest! {
    #[test]
    fn chunking_never_changes_the_line_sequence(
        lines in prop::collection::vec(line_strategy(), 0..12),
        sizes in prop::collection::vec(1usize..9, 0..128),
    ) {
        let mut stream = Vec::new();
        for line in &lines {
            stream.extend_from_slice(line.as_bytes());
            stream.extend_from_slice(b"\r\n");
        }

        let whole = decode_whole(&stream);
        let chunked = decode_chunked(&split_by_sizes(&stream, &sizes));

        prop_assert_eq!(&whole, &lines);
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn trailing_fragment_is_retained_not_emitted(
        lines in prop::collection::vec(line_strategy(), 0..8),
        fragment in line_strategy(),
        sizes in prop::collection::vec(1usize..9, 0..128),
    ) {
        let mut stream = Vec::new();
        for line in &lines {
            stream.extend_from_slice(line.as_bytes());
            stream.extend_from_slice(b"\r\n");
        }
        // Unterminated tail: must never appear in the output.
        stream.extend_from_slice(fragment.as_bytes());

        let chunked = decode_chunked(&split_by_sizes(&stream, &sizes));
        prop_assert_eq!(chunked, lines);
    }
}

#[test]
fn test_cut_inside_crlf_terminator() {
    let lines = decode_chunked(&[b"PING :a", b"bc\r", b"\nNICK t", b"ester\r\n"]);
    assert_eq!(lines, vec!["PING :abc", "NICK tester"]);
}

#[test]
fn test_byte_at_a_time() {
    let stream = b":n!u@h PRIVMSG #c :hi\r\nPING :x\r\n";
    let chunks: Vec<&[u8]> = stream.chunks(1).collect();
    assert_eq!(
        decode_chunked(&chunks),
        vec![":n!u@h PRIVMSG #c :hi", "PING :x"]
    );
}
