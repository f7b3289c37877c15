//! Buffered, position-tracking character supply for the tokenizer.
//!
//! [`CharSource`] wraps any [`io::Read`], refills an internal block buffer on
//! demand, and decodes UTF-8 incrementally with [`bstr::decode_utf8`] so that
//! multi-byte sequences split across refills are handled correctly. It
//! supports exactly one level of pushback via [`CharSource::back`].

use std::io;

use crate::error::Location;

/// Bytes read from the underlying stream per refill.
const BLOCK_SIZE: usize = 1024;

/// A character supply with line/column tracking and one-character pushback.
///
/// # Examples
///
/// ```
/// use jsonloom::CharSource;
///
/// let mut source = CharSource::new(std::io::Cursor::new("ab"));
/// assert_eq!(source.next().unwrap(), Some('a'));
/// source.back();
/// assert_eq!(source.next().unwrap(), Some('a'));
/// assert_eq!(source.next().unwrap(), Some('b'));
/// assert_eq!(source.next().unwrap(), None);
/// ```
#[derive(Debug)]
pub struct CharSource<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    end_of_stream: bool,
    pushed: Option<char>,
    last: Option<char>,
    char_count: usize,
    line: usize,
    column: usize,
    // Column before the most recent line feed, restored when a line feed is
    // pushed back. One level deep, like the pushback itself.
    prev_column: usize,
}

impl<R: io::Read> CharSource<R> {
    /// Wraps `inner` with empty buffers and position 1:1.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(BLOCK_SIZE),
            pos: 0,
            end_of_stream: false,
            pushed: None,
            last: None,
            char_count: 0,
            line: 1,
            column: 1,
            prev_column: 1,
        }
    }

    /// Returns the next character, or `None` at end of input.
    pub fn next(&mut self) -> io::Result<Option<char>> {
        let ch = match self.pushed.take() {
            Some(ch) => ch,
            None => match self.decode_next()? {
                Some(ch) => ch,
                None => {
                    self.last = None;
                    return Ok(None);
                }
            },
        };
        self.char_count += 1;
        if ch == '\n' {
            self.prev_column = self.column;
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.last = Some(ch);
        Ok(Some(ch))
    }

    /// Un-reads the character most recently returned by [`next`].
    ///
    /// Position counters are rolled back, including across a line boundary.
    /// Calling `back` twice without an intervening `next`, or before any
    /// character has been read, is a programming error and panics. Calling it
    /// after `next` returned `None` is a no-op.
    ///
    /// [`next`]: CharSource::next
    pub fn back(&mut self) {
        assert!(
            self.pushed.is_none(),
            "back() called twice without an intervening next()"
        );
        let Some(ch) = self.last.take() else {
            return;
        };
        self.char_count -= 1;
        if ch == '\n' {
            self.line -= 1;
            self.column = self.prev_column;
        } else {
            self.column -= 1;
        }
        self.pushed = Some(ch);
    }

    /// Returns the next character without consuming it.
    pub fn peek(&mut self) -> io::Result<Option<char>> {
        match self.next()? {
            Some(ch) => {
                self.back();
                Ok(Some(ch))
            }
            None => Ok(None),
        }
    }

    /// The position of the next character to be returned.
    #[must_use]
    pub fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
            char_count: self.char_count,
        }
    }

    fn decode_next(&mut self) -> io::Result<Option<char>> {
        loop {
            let rest = &self.buf[self.pos..];
            if rest.is_empty() {
                if self.end_of_stream {
                    return Ok(None);
                }
                self.fill()?;
                continue;
            }
            match bstr::decode_utf8(rest) {
                (Some(ch), len) => {
                    self.pos += len;
                    return Ok(Some(ch));
                }
                (None, len) => {
                    // Possibly a sequence truncated at the block boundary;
                    // pull more bytes before giving up on it.
                    if !self.end_of_stream && rest.len() < 4 {
                        self.fill()?;
                        continue;
                    }
                    self.pos += len.max(1);
                    return Ok(Some(char::REPLACEMENT_CHARACTER));
                }
            }
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        let mut block = [0u8; BLOCK_SIZE];
        loop {
            match self.inner.read(&mut block) {
                Ok(0) => {
                    self.end_of_stream = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&block[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use super::*;

    fn drain(text: &str) -> String {
        let mut source = CharSource::new(Cursor::new(text.as_bytes().to_vec()));
        let mut out = String::new();
        while let Some(ch) = source.next().unwrap() {
            out.push(ch);
        }
        out
    }

    /// Yields its input one byte per read call, to exercise refills.
    struct OneByte<'a>(&'a [u8]);

    impl Read for OneByte<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((b, rest)) => {
                    buf[0] = *b;
                    self.0 = rest;
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }

    #[test]
    fn reads_all_characters() {
        assert_eq!(drain("hello"), "hello");
        assert_eq!(drain(""), "");
    }

    #[test]
    fn decodes_utf8_split_across_refills() {
        let text = "å∫ç\u{1F600}x";
        let mut source = CharSource::new(OneByte(text.as_bytes()));
        let mut out = String::new();
        while let Some(ch) = source.next().unwrap() {
            out.push(ch);
        }
        assert_eq!(out, text);
    }

    #[test]
    fn tracks_line_and_column() {
        let mut source = CharSource::new(Cursor::new("a\nbc"));
        assert_eq!((source.location().line, source.location().column), (1, 1));
        source.next().unwrap(); // a
        assert_eq!((source.location().line, source.location().column), (1, 2));
        source.next().unwrap(); // \n
        assert_eq!((source.location().line, source.location().column), (2, 1));
        source.next().unwrap(); // b
        assert_eq!((source.location().line, source.location().column), (2, 2));
        assert_eq!(source.location().char_count, 3);
    }

    #[test]
    fn back_rolls_counters_across_a_line_boundary() {
        let mut source = CharSource::new(Cursor::new("a\nb"));
        source.next().unwrap();
        source.next().unwrap(); // \n
        assert_eq!(source.location().line, 2);
        source.back();
        assert_eq!((source.location().line, source.location().column), (1, 2));
        assert_eq!(source.next().unwrap(), Some('\n'));
        assert_eq!(source.location().line, 2);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut source = CharSource::new(Cursor::new("xy"));
        assert_eq!(source.peek().unwrap(), Some('x'));
        assert_eq!(source.peek().unwrap(), Some('x'));
        assert_eq!(source.next().unwrap(), Some('x'));
        assert_eq!(source.next().unwrap(), Some('y'));
        assert_eq!(source.peek().unwrap(), None);
    }

    #[test]
    #[should_panic(expected = "back() called twice")]
    fn double_back_panics() {
        let mut source = CharSource::new(Cursor::new("ab"));
        source.next().unwrap();
        source.back();
        source.back();
    }

    #[test]
    fn back_after_eof_is_a_no_op() {
        let mut source = CharSource::new(Cursor::new("a"));
        source.next().unwrap();
        assert_eq!(source.next().unwrap(), None);
        source.back();
        assert_eq!(source.next().unwrap(), None);
    }
}
