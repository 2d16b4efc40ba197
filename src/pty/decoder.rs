/// Incremental, permissive UTF-8 decoding of child output.
///
/// Invalid bytes become U+FFFD. A multi-byte sequence cut off at the end of
/// a chunk is held back until the next chunk completes it.
#[derive(Debug, Default)]
pub struct OutputDecoder {
    pending: Vec<u8>,
}

impl OutputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }

    /// Flush whatever is still held back, replacing it if incomplete.
    pub fn finish(&mut self) -> String {
        let tail = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&tail).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_passes_through() {
        let mut decoder = OutputDecoder::new();
        assert_eq!(decoder.decode(b"hello\r\n"), "hello\r\n");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn split_sequence_is_carried_over() {
        let bytes = "héllo ✓".as_bytes();
        let mut decoder = OutputDecoder::new();
        let mut text = String::new();
        for chunk in bytes.chunks(1) {
            text.push_str(&decoder.decode(chunk));
        }
        text.push_str(&decoder.finish());
        assert_eq!(text, "héllo ✓");
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let mut decoder = OutputDecoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_tail_is_replaced_on_finish() {
        let mut decoder = OutputDecoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xe2, 0x9c]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }
}
