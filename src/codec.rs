//! CRLF line framing over the raw byte stream.
//!
//! [`LineCodec`] accumulates received bytes and yields complete protocol
//! lines; the unterminated tail stays buffered until the next read, so
//! chunk boundaries never affect the line sequence. Encoding appends the
//! CRLF terminator.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error::SessionError;

/// Maximum length of one protocol line, terminator included.
pub const MAX_LINE_LEN: usize = 8191;

/// Framing codec for CRLF-delimited UTF-8 text lines.
///
/// A completed line that is not valid UTF-8 degrades to an empty line
/// (which the session skips) rather than failing the connection. Bare
/// `\n` terminators are tolerated.
#[derive(Debug, Default)]
pub struct LineCodec {
    // Scan resumes here so buffered bytes are never re-examined.
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = SessionError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, SessionError> {
        let newline = src[self.next_index..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|offset| self.next_index + offset);

        let Some(idx) = newline else {
            if src.len() > MAX_LINE_LEN {
                return Err(SessionError::LineTooLong(src.len()));
            }
            self.next_index = src.len();
            return Ok(None);
        };

        self.next_index = 0;
        let mut frame = src.split_to(idx + 1);
        frame.truncate(idx);
        if frame.last() == Some(&b'\r') {
            frame.truncate(frame.len() - 1);
        }

        if frame.len() > MAX_LINE_LEN {
            return Err(SessionError::LineTooLong(frame.len()));
        }

        match String::from_utf8(frame.to_vec()) {
            Ok(line) => Ok(Some(line)),
            Err(_) => {
                debug!("dropping line with invalid utf-8");
                Ok(Some(String::new()))
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, SessionError> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None => {
                // A trailing fragment with no terminator is not a line.
                if !src.is_empty() {
                    debug!(bytes = src.len(), "discarding unterminated fragment at eof");
                    src.clear();
                    self.next_index = 0;
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = SessionError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), SessionError> {
        if line.len() > MAX_LINE_LEN {
            return Err(SessionError::LineTooLong(line.len()));
        }
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
