//! Incremental UTF-8 decoding of network chunks
//!
//! Chunk boundaries can split a multi-byte sequence. The incomplete tail of a
//! chunk is carried over (at most 3 bytes) and completed by the next one.
//! Invalid sequences decode to U+FFFD, as does a truncated tail at stream end.

use std::borrow::Cow;

const REPLACEMENT: char = '\u{FFFD}';

/// Byte-to-text decoder with carry-over between chunks
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    carry: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, holding back a trailing partial sequence
    pub fn feed(&mut self, chunk: &[u8]) -> String {
        let input: Cow<[u8]> = if self.carry.is_empty() {
            Cow::Borrowed(chunk)
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(chunk);
            Cow::Owned(joined)
        };

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &rest[valid + len..];
                        }
                        None => {
                            // incomplete sequence at the end of input
                            self.carry = rest[valid..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end of stream
    pub fn finish(&mut self) -> String {
        if self.carry.is_empty() {
            String::new()
        } else {
            self.carry.clear();
            REPLACEMENT.to_string()
        }
    }

    /// Bytes currently held back
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}
