//! Reverse line reader for append-only logs.
//!
//! Reads fixed-size chunks from the end of a seekable source and yields lines
//! newest-first, so the latest state of a session is found without reading
//! the whole file. Every byte is scanned for a newline once; a line that
//! spans several chunks is kept as a stack of pieces and joined only when its
//! start is found.

use std::io::{self, Read, Seek, SeekFrom};

const CHUNK_SIZE: usize = 8 * 1024;

/// Lines longer than this are skipped rather than buffered.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Iterator over the non-empty lines of a source, last line first.
pub struct ReverseLines<R> {
    reader: R,
    /// Offset of the first byte not yet pulled into `buf`.
    pos: u64,
    /// Unscanned bytes covering `[pos, pos + buf.len())`.
    buf: Vec<u8>,
    /// Already-scanned pieces of the line being assembled, latest piece last.
    pieces: Vec<Vec<u8>>,
    pieces_len: usize,
    /// The line being assembled passed `max_line_bytes`; drop it at its start.
    oversized: bool,
    skipped: usize,
    chunk_size: usize,
    max_line_bytes: usize,
    done: bool,
}

impl<R: Read + Seek> ReverseLines<R> {
    pub fn new(reader: R) -> io::Result<Self> {
        Self::with_chunk_size(reader, CHUNK_SIZE)
    }

    pub fn with_chunk_size(mut reader: R, chunk_size: usize) -> io::Result<Self> {
        let pos = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            reader,
            pos,
            buf: Vec::new(),
            pieces: Vec::new(),
            pieces_len: 0,
            oversized: false,
            skipped: 0,
            chunk_size: chunk_size.max(1),
            max_line_bytes: MAX_LINE_BYTES,
            done: false,
        })
    }

    #[must_use]
    pub fn max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    /// Number of lines dropped for exceeding the length limit so far.
    pub const fn skipped_long_lines(&self) -> usize {
        self.skipped
    }

    fn fill(&mut self) -> io::Result<()> {
        let want = u64::try_from(self.chunk_size).unwrap_or(u64::MAX).min(self.pos);
        let start = self.pos - want;
        self.reader.seek(SeekFrom::Start(start))?;

        let mut chunk = vec![0u8; usize::try_from(want).unwrap_or(self.chunk_size)];
        self.reader.read_exact(&mut chunk)?;
        self.buf = chunk;
        self.pos = start;
        Ok(())
    }

    /// Park the whole of `buf` as a piece of the current line.
    fn stash(&mut self) {
        let piece = std::mem::take(&mut self.buf);
        if self.oversized || piece.is_empty() {
            return;
        }
        self.pieces_len += piece.len();
        if self.pieces_len > self.max_line_bytes {
            self.oversized = true;
            self.pieces.clear();
            self.pieces_len = 0;
        } else {
            self.pieces.push(piece);
        }
    }

    /// Join `head` with the stashed pieces, or `None` if the line is dropped.
    fn finish_line(&mut self, head: &[u8]) -> Option<Vec<u8>> {
        let total = head.len() + self.pieces_len;
        if std::mem::take(&mut self.oversized) || total > self.max_line_bytes {
            self.pieces.clear();
            self.pieces_len = 0;
            self.skipped += 1;
            tracing::debug!(bytes = total, "skipping overlong log line");
            return None;
        }

        let mut line = Vec::with_capacity(total);
        line.extend_from_slice(head);
        for piece in self.pieces.drain(..).rev() {
            line.extend_from_slice(&piece);
        }
        self.pieces_len = 0;
        Some(line)
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(idx) = self.buf.iter().rposition(|&b| b == b'\n') {
                let head = self.buf.split_off(idx + 1);
                self.buf.truncate(idx);
                if let Some(text) = self.finish_line(&head).as_deref().and_then(decode) {
                    return Ok(Some(text));
                }
                continue;
            }

            if self.pos == 0 {
                let head = std::mem::take(&mut self.buf);
                return Ok(self.finish_line(&head).as_deref().and_then(decode));
            }

            self.stash();
            self.fill()?;
        }
    }
}

fn decode(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(String::from_utf8_lossy(bytes).into_owned())
}

impl<R: Read + Seek> Iterator for ReverseLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(text: &str, chunk: usize) -> Vec<String> {
        ReverseLines::with_chunk_size(Cursor::new(text.as_bytes().to_vec()), chunk)
            .unwrap()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn yields_lines_newest_first() {
        assert_eq!(collect("a\nb\nc\n", 8192), vec!["c", "b", "a"]);
    }

    #[test]
    fn handles_missing_trailing_newline() {
        assert_eq!(collect("first\nsecond", 8192), vec!["second", "first"]);
    }

    #[test]
    fn lines_spanning_chunks_are_reassembled() {
        let text = "alpha-line\nbeta-line-is-longer\ngamma\n";
        for chunk in [1, 2, 3, 5, 7, 64] {
            assert_eq!(
                collect(text, chunk),
                vec!["gamma", "beta-line-is-longer", "alpha-line"],
                "chunk size {chunk}"
            );
        }
    }

    #[test]
    fn skips_blank_lines_and_crlf() {
        assert_eq!(collect("one\r\n\r\n\ntwo\r\n", 4), vec!["two", "one"]);
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert!(collect("", 16).is_empty());
        assert!(collect("\n\n", 16).is_empty());
    }

    #[test]
    fn multibyte_text_survives_chunk_split() {
        assert_eq!(collect("héllo\nwörld\n", 1), vec!["wörld", "héllo"]);
    }

    #[test]
    fn overlong_line_is_skipped_in_one_pass() {
        let mut text = b"{\"usage\":1}\n".to_vec();
        text.extend(std::iter::repeat_n(b'x', 20 * 1024 * 1024));
        text.extend_from_slice(b"\nlast\n");

        let mut lines = ReverseLines::new(Cursor::new(text)).unwrap();
        let got: Vec<String> = lines.by_ref().map(Result::unwrap).collect();

        assert_eq!(got, vec!["last", "{\"usage\":1}"]);
        assert_eq!(lines.skipped_long_lines(), 1);
    }

    #[test]
    fn long_line_under_limit_is_reassembled() {
        let long = "y".repeat(3 * 1024 * 1024);
        let text = format!("head\n{long}\ntail\n");

        let got = collect(&text, CHUNK_SIZE);
        assert_eq!(got.len(), 3);
        assert_eq!(got[1].len(), long.len());
        assert_eq!(got[2], "head");
    }

    #[test]
    fn limit_applies_to_first_line_and_custom_bounds() {
        let text = "0123456789\nabc\nshort\n0123456789abcdef";
        let mut lines = ReverseLines::with_chunk_size(Cursor::new(text.as_bytes().to_vec()), 3)
            .unwrap()
            .max_line_bytes(8);
        let got: Vec<String> = lines.by_ref().map(Result::unwrap).collect();

        assert_eq!(got, vec!["short", "abc"]);
        assert_eq!(lines.skipped_long_lines(), 2);
    }
}
