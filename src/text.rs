//! Long text streamed as 7-byte fragments.
//!
//! A string up to [`MAX_TEXT_LEN`] bytes is cut into `ceil(len / 7)` text
//! packets. Each packet carries the command id, a sub-command saying whether
//! more fragments follow, and seven text bytes:
//!
//! ```text
//! [0] 0xC8  [1] 0x02 append | 0x01 end  [2] 0x00  [3..10] text, 0xFF padded
//! ```
//!
//! The sending side ([`TextChunker`]) only emits the next fragment when the
//! receiving side has raised its one-shot ready-for-text flag. The receiving
//! side ([`TextAssembler`]) appends fragments until it sees the end marker.

use heapless::String;

use crate::consts::{
    CMD_TEXT, MAX_TEXT_LEN, PAYLOAD_LEN, REG_TEXT, REG_TEXT_POSITION, TEXT_APPEND,
    TEXT_CHUNK_LEN, TEXT_END, TEXT_END_MARKER,
};
use crate::error::{LinkError, Result};

fn is_printable(byte: u8) -> bool {
    byte.is_ascii_graphic() || byte == b' '
}

/// Send-side text session: the string and how much of it has gone out.
#[derive(Debug, Clone, Default)]
pub struct TextChunker {
    text: String<MAX_TEXT_LEN>,
    cursor: usize,
    pending: bool,
}

impl TextChunker {
    /// Creates a chunker with nothing to send.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the text and starts streaming it from the beginning.
    ///
    /// Only printable ASCII and spaces survive the wire, so anything else is
    /// rejected with [`LinkError::UnprintableText`]. An empty string leaves
    /// nothing pending.
    pub fn set(&mut self, text: &str) -> Result<()> {
        self.text.clear();
        self.pending = false;
        if let Some(index) = text.bytes().position(|byte| !is_printable(byte)) {
            return Err(LinkError::UnprintableText { index });
        }
        self.text
            .push_str(text)
            .map_err(|()| LinkError::PayloadTooLong { len: text.len() })?;
        self.restart();
        Ok(())
    }

    /// Streams the current text again from the beginning.
    pub fn restart(&mut self) {
        self.cursor = 0;
        self.pending = !self.text.is_empty();
    }

    /// The text being streamed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `true` while fragments are still owed.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Builds the fragment at the cursor without moving past it.
    ///
    /// Returns the payload and `true` if it is the last one.
    pub fn peek_chunk(&self) -> Option<([u8; PAYLOAD_LEN], bool)> {
        if !self.pending {
            return None;
        }
        let rest = &self.text.as_bytes()[self.cursor..];
        let last = rest.len() <= TEXT_CHUNK_LEN;
        let take = rest.len().min(TEXT_CHUNK_LEN);

        let mut payload = [TEXT_END_MARKER; PAYLOAD_LEN];
        payload[0] = CMD_TEXT;
        payload[REG_TEXT] = if last { TEXT_END } else { TEXT_APPEND };
        payload[REG_TEXT + 1] = 0;
        payload[REG_TEXT_POSITION..REG_TEXT_POSITION + take].copy_from_slice(&rest[..take]);
        Some((payload, last))
    }

    /// Moves the cursor past the fragment [`peek_chunk`](Self::peek_chunk)
    /// returned.
    ///
    /// After the last fragment the cursor goes back to the start and nothing
    /// is pending until [`set`](Self::set) or [`restart`](Self::restart) is
    /// called again.
    pub fn advance(&mut self) {
        if !self.pending {
            return;
        }
        let remaining = self.text.len() - self.cursor;
        if remaining <= TEXT_CHUNK_LEN {
            self.cursor = 0;
            self.pending = false;
        } else {
            self.cursor += TEXT_CHUNK_LEN;
        }
    }

    /// Builds the next fragment and moves past it.
    pub fn next_chunk(&mut self) -> Option<([u8; PAYLOAD_LEN], bool)> {
        let chunk = self.peek_chunk()?;
        self.advance();
        Some(chunk)
    }
}

/// Receive-side text session: rebuilds the string from fragments.
#[derive(Debug, Clone, Default)]
pub struct TextAssembler {
    text: String<MAX_TEXT_LEN>,
    complete: bool,
}

impl TextAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops whatever has been gathered.
    pub fn clear(&mut self) {
        self.text.clear();
        self.complete = false;
    }

    /// Text gathered so far.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns `true` once the last fragment arrived.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Appends one text payload.
    ///
    /// Returns the full string when the fragment was the last one. The next
    /// fragment after that starts a new string. Bytes outside printable ASCII
    /// are replaced with `?`. A string running past [`MAX_TEXT_LEN`] starts
    /// over with the overflowing byte.
    pub fn push_fragment(&mut self, payload: &[u8; PAYLOAD_LEN]) -> Option<&str> {
        if self.complete {
            self.clear();
        }
        let data = &payload[REG_TEXT_POSITION..REG_TEXT_POSITION + TEXT_CHUNK_LEN];
        for &byte in data.iter().take_while(|&&b| b != TEXT_END_MARKER) {
            let c = if is_printable(byte) {
                char::from(byte)
            } else {
                '?'
            };
            if self.text.push(c).is_err() {
                self.text.clear();
                let _ = self.text.push(c);
            }
        }

        if payload[REG_TEXT] == TEXT_END {
            self.complete = true;
            Some(&self.text)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String as StdString;
    use std::vec::Vec;

    fn drain(chunker: &mut TextChunker) -> Vec<([u8; PAYLOAD_LEN], bool)> {
        core::iter::from_fn(|| chunker.next_chunk()).collect()
    }

    #[test]
    fn test_fifteen_chars_make_three_fragments() {
        let mut chunker = TextChunker::new();
        chunker.set("Hello, MiniDisc").unwrap();
        let chunks = drain(&mut chunker);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].0[REG_TEXT], TEXT_APPEND);
        assert_eq!(chunks[1].0[REG_TEXT], TEXT_APPEND);
        assert_eq!(chunks[2].0[REG_TEXT], TEXT_END);
        assert_eq!(&chunks[0].0[3..], b"Hello, ");
        assert_eq!(&chunks[1].0[3..], b"MiniDis");
        assert_eq!(
            chunks[2].0,
            [CMD_TEXT, TEXT_END, 0, b'c', 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            chunks.iter().map(|c| c.1).collect::<Vec<_>>(),
            [false, false, true]
        );
        assert!(!chunker.is_pending());
    }

    #[test]
    fn test_exact_multiple_ends_on_full_fragment() {
        let mut chunker = TextChunker::new();
        chunker.set("abcdefghijklmn").unwrap();
        let chunks = drain(&mut chunker);
        assert_eq!(chunks.len(), 2);
        assert_eq!(&chunks[1].0[3..], b"hijklmn");
        assert!(chunks[1].1);
    }

    #[test]
    fn test_every_length_reassembles() {
        for len in 1..=MAX_TEXT_LEN {
            let text: StdString = (0..len).map(|i| char::from(b'A' + (i % 26) as u8)).collect();
            let mut chunker = TextChunker::new();
            chunker.set(&text).unwrap();
            let mut assembler = TextAssembler::new();

            let mut fragments = 0;
            let mut received = None;
            while let Some((payload, last)) = chunker.next_chunk() {
                fragments += 1;
                received = assembler.push_fragment(&payload).map(StdString::from);
                assert_eq!(received.is_some(), last);
            }
            assert_eq!(fragments, len.div_ceil(TEXT_CHUNK_LEN), "len {}", len);
            assert_eq!(received.as_deref(), Some(text.as_str()));
        }
    }

    #[test]
    fn test_empty_text_is_not_pending() {
        let mut chunker = TextChunker::new();
        chunker.set("").unwrap();
        assert!(!chunker.is_pending());
        assert!(chunker.next_chunk().is_none());
    }

    #[test]
    fn test_too_long_text_is_rejected() {
        let mut chunker = TextChunker::new();
        let long = [b'x'; MAX_TEXT_LEN + 1];
        let long = core::str::from_utf8(&long).unwrap();
        assert_eq!(
            chunker.set(long),
            Err(LinkError::PayloadTooLong {
                len: MAX_TEXT_LEN + 1
            })
        );
        assert!(!chunker.is_pending());
    }

    #[test]
    fn test_unprintable_text_is_rejected() {
        let mut chunker = TextChunker::new();
        chunker.set("ok").unwrap();
        assert_eq!(
            chunker.set("caf\u{e9}"),
            Err(LinkError::UnprintableText { index: 3 })
        );
        assert_eq!(
            chunker.set("tab\there"),
            Err(LinkError::UnprintableText { index: 3 })
        );
        assert!(!chunker.is_pending());
        assert_eq!(chunker.text(), "");
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut chunker = TextChunker::new();
        chunker.set("0123456789").unwrap();
        let first = chunker.peek_chunk().unwrap();
        assert_eq!(chunker.peek_chunk(), Some(first));
        assert_eq!(chunker.next_chunk(), Some(first));
        let (second, last) = chunker.peek_chunk().unwrap();
        assert!(last);
        assert_eq!(&second[3..6], b"789");
        chunker.advance();
        assert!(!chunker.is_pending());
        assert!(chunker.peek_chunk().is_none());
    }

    #[test]
    fn test_restart_resends_from_start() {
        let mut chunker = TextChunker::new();
        chunker.set("0123456789").unwrap();
        let first = drain(&mut chunker);
        chunker.restart();
        assert_eq!(drain(&mut chunker), first);
    }

    #[test]
    fn test_assembler_replaces_non_ascii() {
        let mut assembler = TextAssembler::new();
        let payload = [CMD_TEXT, TEXT_END, 0, b'o', 0x8A, b'k', 0x07, 0xFF, b'z', b'z'];
        assert_eq!(assembler.push_fragment(&payload), Some("o?k?"));
    }

    #[test]
    fn test_assembler_starts_over_after_end() {
        let mut assembler = TextAssembler::new();
        let end = [CMD_TEXT, TEXT_END, 0, b'a', 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(assembler.push_fragment(&end), Some("a"));
        let append = [CMD_TEXT, TEXT_APPEND, 0, b'b', b'c', b'd', b'e', b'f', b'g', b'h'];
        assert_eq!(assembler.push_fragment(&append), None);
        assert_eq!(assembler.as_str(), "bcdefgh");
        assert!(!assembler.is_complete());
    }

    #[test]
    fn test_assembler_overflow_restarts() {
        let mut assembler = TextAssembler::new();
        let append = [CMD_TEXT, TEXT_APPEND, 0, b'x', b'x', b'x', b'x', b'x', b'x', b'x'];
        for _ in 0..10 {
            let _ = assembler.push_fragment(&append);
        }
        assert_eq!(assembler.as_str().len(), 10 * TEXT_CHUNK_LEN - MAX_TEXT_LEN);
    }
}
