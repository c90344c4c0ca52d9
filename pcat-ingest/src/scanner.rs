//! Extraction of complete JSON objects from an accumulating text buffer
//!
//! The scanner tracks brace depth and string literals (with backslash
//! escapes), so braces and quotes inside string values never end an object
//! early. Scan state survives across `push` calls: text already scanned is
//! never rescanned while an object is still incomplete.
//!
//! Text before an object's opening brace is stray and discarded when the
//! object is extracted. The producer frames records as a JSON array, so
//! `[`, `]`, `,` and whitespace are expected strays.

use tracing::trace;

/// Depth- and quote-aware JSON object scanner
#[derive(Debug, Default)]
pub struct ObjectScanner {
    buffer: String,
    /// Byte offset where scanning resumes
    cursor: usize,
    /// Offset of the current object's opening brace
    start: Option<usize>,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl ObjectScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text
    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Extract the next complete top-level object, if any
    ///
    /// Returns `None` when the buffer holds no complete object; the buffer is
    /// retained and scanning resumes where it stopped on the next call.
    pub fn next_object(&mut self) -> Option<String> {
        // structural characters are ASCII, so byte scanning is UTF-8 safe
        let bytes = self.buffer.as_bytes();
        let mut i = self.cursor;

        while i < bytes.len() {
            let b = bytes[i];
            if self.depth == 0 {
                if b == b'{' {
                    self.start = Some(i);
                    self.depth = 1;
                }
            } else if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
            } else {
                match b {
                    b'"' => self.in_string = true,
                    b'{' => self.depth += 1,
                    b'}' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            return Some(self.take_object(i));
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }

        self.cursor = i;
        None
    }

    /// Iterate over every complete object currently buffered
    pub fn objects(&mut self) -> impl Iterator<Item = String> + '_ {
        std::iter::from_fn(move || self.next_object())
    }

    /// Unconsumed text
    pub fn remainder(&self) -> &str {
        &self.buffer
    }

    /// Whether an object has started but not closed
    pub fn in_object(&self) -> bool {
        self.depth > 0
    }

    /// Clear the buffer at end of stream, returning leftover non-stray text
    pub fn finish(&mut self) -> Option<String> {
        let leftover = std::mem::take(&mut self.buffer);
        let incomplete = self.start.map(|start| leftover[start..].to_string());
        *self = Self::default();
        incomplete
    }

    fn take_object(&mut self, end: usize) -> String {
        let start = self.start.take().unwrap_or(0);
        let stray = &self.buffer[..start];
        if stray.chars().any(|c| !is_framing(c)) {
            trace!(stray = %stray, "Discarding stray text before object");
        }
        let object = self.buffer[start..=end].to_string();
        self.buffer.drain(..=end);
        self.cursor = 0;
        self.in_string = false;
        self.escaped = false;
        object
    }
}

/// Array framing emitted around records by the producer
fn is_framing(c: char) -> bool {
    c.is_whitespace() || matches!(c, '[' | ']' | ',')
}
