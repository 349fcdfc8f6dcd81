use std::str;

/// A malformed byte sequence in the response body.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The bytes at `offset` do not form valid UTF-8.
    #[error("invalid UTF-8 sequence at byte {offset}")]
    InvalidSequence {
        /// Offset counted from the start of the stream.
        offset: usize,
    },
    /// The stream ended in the middle of a multi-byte character.
    #[error("stream ended with {pending} byte(s) of an incomplete character")]
    Truncated {
        /// Number of dangling bytes.
        pending: usize,
    },
}

/// A stateful UTF-8 decoder for chunked input.
///
/// A multi-byte character may straddle two chunks. The decoder keeps the
/// leading bytes of such a character until the rest arrives, and only ever
/// emits complete characters.
#[derive(Clone, Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
    consumed: usize,
}

impl Utf8Decoder {
    /// Creates a decoder with empty state.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the next chunk.
    ///
    /// Returns the text made of every character completed by this chunk,
    /// which may be empty if the chunk only carried part of a character.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let valid_len = match str::from_utf8(&bytes) {
            Ok(_) => bytes.len(),
            Err(err) => {
                if err.error_len().is_some() {
                    return Err(DecodeError::InvalidSequence {
                        offset: self.consumed + err.valid_up_to(),
                    });
                }
                // The tail is the prefix of a character, keep it for the
                // next chunk.
                err.valid_up_to()
            }
        };

        self.pending = bytes.split_off(valid_len);
        self.consumed += valid_len;
        if !self.pending.is_empty() {
            trace!("carrying {} byte(s) to the next chunk", self.pending.len());
        }

        String::from_utf8(bytes).map_err(|err| DecodeError::InvalidSequence {
            offset: self.consumed + err.utf8_error().valid_up_to(),
        })
    }

    /// Checks that the input ended on a character boundary.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let pending = self.pending.len();
        self.pending.clear();
        Err(DecodeError::Truncated { pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ascii() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"hello").unwrap(), "hello");
        assert_eq!(decoder.decode(b" world").unwrap(), " world");
        decoder.finish().unwrap();
    }

    #[test]
    fn test_split_character() {
        // "é" is 0xC3 0xA9, "世" is 0xE4 0xB8 0x96.
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"caf\xC3").unwrap(), "caf");
        assert_eq!(decoder.decode(b"\xA9 \xE4").unwrap(), "é ");
        assert_eq!(decoder.decode(b"\xB8").unwrap(), "");
        assert_eq!(decoder.decode(b"\x96!").unwrap(), "世!");
        decoder.finish().unwrap();
    }

    #[test]
    fn test_invalid_sequence() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"abc").unwrap(), "abc");
        assert_eq!(
            decoder.decode(b"d\xFFe").unwrap_err(),
            DecodeError::InvalidSequence { offset: 4 }
        );
    }

    #[test]
    fn test_truncated_at_end() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"ok\xF0\x9F").unwrap(), "ok");
        assert_eq!(
            decoder.finish().unwrap_err(),
            DecodeError::Truncated { pending: 2 }
        );
    }
}
