use std::str;

/// Incremental UTF-8 decoder for streamed byte chunks.
///
/// The transport hands us arbitrary byte slices, so a multi-byte character
/// can be split across chunk boundaries. The decoder keeps the undecodable
/// tail of each chunk buffered and prepends it to the next one, so callers
/// always get back whole characters.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of the buffered input as possible and return it.
    ///
    /// Bytes that form the start of an incomplete character stay buffered
    /// until the next call. Invalid sequences become U+FFFD.
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::new();
        loop {
            match str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            // Trailing bytes may be the start of a character
                            // whose remainder is still in flight.
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is still buffered at end-of-stream.
    ///
    /// A truncated final character decodes lossily rather than vanishing.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
