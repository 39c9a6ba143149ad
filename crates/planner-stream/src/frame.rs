//! Incremental frame splitting for the backend's event stream.
//!
//! Bytes arrive in arbitrary chunks. They are decoded to text first, with an
//! incomplete UTF-8 tail carried over to the next chunk, and only then searched
//! for the `"\n\n"` frame delimiter.

use tracing::warn;

/// Separator between two frames on the wire.
pub const FRAME_DELIMITER: &str = "\n\n";

/// One delimiter-bounded block of the wire stream, without its delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    /// Creates a frame from already-split text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the frame text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the frame and returns its text.
    pub fn into_string(self) -> String {
        self.0
    }
}

/// UTF-8 decoder that tolerates characters split across chunks.
///
/// Invalid sequences decode to U+FFFD. A trailing sequence that is merely
/// incomplete is held back until the next call.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    tail: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Decodes `chunk`, prefixed by any bytes held back from the previous call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.tail);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.tail = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flushes bytes still held back at end of input.
    pub fn finish(&mut self) -> Option<String> {
        if self.tail.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.tail);
        Some(String::from_utf8_lossy(&tail).into_owned())
    }

    /// Number of bytes waiting for the rest of their character.
    pub fn pending_bytes(&self) -> usize {
        self.tail.len()
    }
}

/// Turns an arbitrarily-chunked byte stream into complete frames.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    decoder: Utf8StreamDecoder,
    pending: String,
    // Byte offset in `pending` before which no delimiter can start.
    scan_from: usize,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every frame it completed, in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let text = self.decoder.decode(chunk);
        self.push_text(&text)
    }

    /// Feeds already-decoded text.
    pub fn push_text(&mut self, text: &str) -> Vec<Frame> {
        if text.is_empty() {
            return Vec::new();
        }
        self.pending.push_str(text);

        let mut frames = Vec::new();
        while let Some(offset) = self.pending[self.scan_from..].find(FRAME_DELIMITER) {
            let end = self.scan_from + offset;
            let frame = self.pending[..end].to_string();
            self.pending.drain(..end + FRAME_DELIMITER.len());
            self.scan_from = 0;
            frames.push(Frame(frame));
        }

        // A trailing '\n' may be the first half of the next delimiter.
        self.scan_from = if self.pending.ends_with('\n') {
            self.pending.len() - 1
        } else {
            self.pending.len()
        };
        frames
    }

    /// Text buffered after the last complete frame.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Ends the input. Returns the unterminated remainder, which is discarded.
    pub fn finish(&mut self) -> Option<String> {
        let mut rest = std::mem::take(&mut self.pending);
        self.scan_from = 0;
        if let Some(tail) = self.decoder.finish() {
            rest.push_str(&tail);
        }
        if rest.is_empty() {
            return None;
        }
        warn!(
            bytes = rest.len(),
            "discarding unterminated trailing frame at end of stream"
        );
        Some(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames_text(frames: Vec<Frame>) -> Vec<String> {
        frames.into_iter().map(Frame::into_string).collect()
    }

    fn joined(frames: &[&str]) -> String {
        let mut wire = String::new();
        for frame in frames {
            wire.push_str(frame);
            wire.push_str(FRAME_DELIMITER);
        }
        wire
    }

    #[test]
    fn splits_complete_frames_and_keeps_partial_tail() {
        let mut splitter = FrameSplitter::new();
        let frames = splitter.feed(b"data: one\n\ndata: two\n\ndata: thr");
        assert_eq!(frames_text(frames), vec!["data: one", "data: two"]);
        assert_eq!(splitter.pending(), "data: thr");

        let frames = splitter.feed(b"ee\n\n");
        assert_eq!(frames_text(frames), vec!["data: three"]);
        assert_eq!(splitter.pending(), "");
    }

    #[test]
    fn split_at_every_byte_boundary_yields_same_frames() {
        let expected = ["data: parsing", "data: planning", ": keepalive", "data: é 🎓 done"];
        let wire = joined(&expected);
        let bytes = wire.as_bytes();

        for cut in 0..=bytes.len() {
            let mut splitter = FrameSplitter::new();
            let mut frames = splitter.feed(&bytes[..cut]);
            frames.extend(splitter.feed(&bytes[cut..]));
            assert_eq!(frames_text(frames), expected, "cut at {cut}");
            assert_eq!(splitter.finish(), None, "cut at {cut}");
        }
    }

    #[test]
    fn byte_at_a_time_yields_same_frames() {
        let expected = ["data: a", "data: [FINAL_OUTPUT] [[\"User\",\"Query\",\"ü\"]]", "x"];
        let wire = joined(&expected);

        let mut splitter = FrameSplitter::new();
        let mut frames = Vec::new();
        for byte in wire.as_bytes() {
            frames.extend(splitter.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(frames_text(frames), expected);
    }

    #[test]
    fn multibyte_character_split_across_chunks_is_reassembled() {
        let wire = "data: café 🎓\n\n".as_bytes();
        let emoji_start = wire.len() - 2 - 4;

        let mut splitter = FrameSplitter::new();
        assert!(splitter.feed(&wire[..emoji_start + 2]).is_empty());
        assert_eq!(splitter.decoder.pending_bytes(), 2);
        assert!(!splitter.pending().contains(char::REPLACEMENT_CHARACTER));

        let frames = splitter.feed(&wire[emoji_start + 2..]);
        assert_eq!(frames_text(frames), vec!["data: café 🎓"]);
    }

    #[test]
    fn invalid_utf8_becomes_replacement_character() {
        let mut decoder = Utf8StreamDecoder::default();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{fffd}b");
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn consecutive_delimiters_yield_empty_frames() {
        let mut splitter = FrameSplitter::new();
        let frames = splitter.feed(b"data: a\n\n\n\ndata: b\n\n");
        assert_eq!(frames_text(frames), vec!["data: a", "", "data: b"]);
    }

    #[test]
    fn delimiter_split_between_chunks_is_found() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.feed(b"data: a\n").is_empty());
        let frames = splitter.feed(b"\ndata: b");
        assert_eq!(frames_text(frames), vec!["data: a"]);
        assert_eq!(splitter.pending(), "data: b");
    }

    #[test]
    fn finish_discards_unterminated_tail() {
        let mut splitter = FrameSplitter::new();
        assert_eq!(frames_text(splitter.feed(b"data: a\n\ndata: half")), vec!["data: a"]);
        assert_eq!(splitter.finish().as_deref(), Some("data: half"));
        assert_eq!(splitter.pending(), "");
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn finish_flushes_incomplete_character_lossily() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.feed(&"é".as_bytes()[..1]).is_empty());
        assert_eq!(splitter.finish().as_deref(), Some("\u{fffd}"));
    }
}
