//! Frame assembly: transport chunks to complete lines.
//!
//! Transport reads arrive with arbitrary boundaries. Two small stateful stages
//! undo that:
//!
//! 1. [`Utf8ChunkDecoder`] turns byte chunks into text, holding back a
//!    multi-byte character that was cut in half.
//! 2. [`LineAssembler`] turns text chunks into complete lines, holding back
//!    the unterminated tail.
//!
//! A line is emitted exactly once, and only after its terminator was seen.

/// Streaming UTF-8 decoder.
///
/// Invalid sequences are replaced with U+FFFD; an incomplete sequence at the
/// end of a chunk waits for the next one.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        out
    }

    /// Flush bytes of an incomplete trailing character, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(tail)
    }
}

/// Splits a text stream into `\n`-terminated lines.
///
/// A trailing `\r` is stripped from every line so CRLF streams decode the same.
#[derive(Debug, Default)]
pub struct LineAssembler {
    remainder: String,
}

impl LineAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a text chunk and return every line it completed, in order.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let offset = self.remainder.len();
        self.remainder.push_str(chunk);

        // The held remainder never contains a terminator, so only the new chunk needs scanning.
        let Some(last_newline) = chunk.rfind('\n') else {
            return Vec::new();
        };

        let tail = self.remainder.split_off(offset + last_newline + 1);
        let mut complete = std::mem::replace(&mut self.remainder, tail);
        complete.pop();

        complete
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect()
    }

    /// The unterminated text held so far.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.remainder
    }

    /// End the stream, returning the discarded unterminated remainder, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.remainder.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.remainder))
        }
    }
}
