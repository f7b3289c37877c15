//! Replaying a captured [`JsonBuffer`] as a token stream.

use crate::{
    buffer::JsonBuffer,
    error::ReadError,
    reader::JsonReader,
    token::{Token, TokenClass},
};

/// A reader that replays the tokens of a [`JsonBuffer`].
///
/// Replay is infallible once the buffer exists; `read` never returns an
/// error. The reader starts at `Bof` like any other and produces `Eof`
/// after the buffer's last token.
///
/// # Examples
///
/// ```
/// use jsonloom::{JsonBuffer, JsonReader};
///
/// let buffer = JsonBuffer::parse("[1, 2]").unwrap();
/// let mut reader = buffer.read();
/// reader.read().unwrap();
/// assert_eq!(reader.token_class(), jsonloom::TokenClass::Array);
/// assert_eq!(&*reader.read_number().unwrap(), "1");
/// ```
#[derive(Debug, Clone)]
pub struct JsonBufferReader {
    buffer: JsonBuffer,
    next: usize,
    current: Token,
    depth: usize,
}

impl JsonBufferReader {
    /// A reader positioned at `Bof`, before `buffer`'s first token.
    #[must_use]
    pub fn new(buffer: JsonBuffer) -> Self {
        Self {
            buffer,
            next: 0,
            current: Token::bof(),
            depth: 0,
        }
    }

    /// The buffer being replayed.
    #[must_use]
    pub fn buffer(&self) -> &JsonBuffer {
        &self.buffer
    }
}

impl JsonReader for JsonBufferReader {
    fn read(&mut self) -> Result<bool, ReadError> {
        if self.eof() {
            return Ok(false);
        }
        if self.next >= self.buffer.len() {
            self.current = Token::eof();
            return Ok(false);
        }
        let token = self.buffer.get(self.next);
        self.next += 1;
        match token.class() {
            TokenClass::Array | TokenClass::Object => self.depth += 1,
            TokenClass::EndArray | TokenClass::EndObject => self.depth -= 1,
            _ => {}
        }
        self.current = token;
        Ok(true)
    }

    fn token(&self) -> &Token {
        &self.current
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(reader: &mut dyn JsonReader) -> Vec<Token> {
        let mut out = Vec::new();
        while reader.read().unwrap() {
            out.push(reader.token().clone());
        }
        out
    }

    #[test]
    fn replays_the_captured_tokens() {
        let buffer = JsonBuffer::parse(r#"{"a": [1, null], "b": true}"#).unwrap();
        assert_eq!(
            drain(&mut buffer.read()),
            vec![
                Token::object(),
                Token::member("a"),
                Token::array(),
                Token::number("1"),
                Token::null(),
                Token::end_array(),
                Token::member("b"),
                Token::boolean(true),
                Token::end_object(),
            ]
        );
    }

    #[test]
    fn replay_is_repeatable() {
        let buffer = JsonBuffer::parse("[1, 2]").unwrap();
        assert_eq!(drain(&mut buffer.read()), drain(&mut buffer.read()));
    }

    #[test]
    fn empty_buffer_is_immediate_eof() {
        let mut reader = JsonBuffer::empty().read();
        assert!(!reader.read().unwrap());
        assert!(reader.eof());
        // Reading at Eof stays at Eof.
        assert!(!reader.read().unwrap());
    }

    #[test]
    fn depth_tracks_replayed_containers() {
        let buffer = JsonBuffer::parse("[[7]]").unwrap();
        let mut reader = buffer.read();
        reader.read().unwrap();
        reader.read().unwrap();
        assert_eq!(reader.depth(), 2);
        reader.read().unwrap(); // 7
        reader.read().unwrap(); // ]
        assert_eq!(reader.depth(), 1);
    }

    #[test]
    fn sliced_buffers_replay_their_view_only() {
        let buffer = JsonBuffer::parse("[[1,2],[3]]").unwrap();
        let second = buffer.slice(5, 8); // [3]
        assert_eq!(
            drain(&mut second.read()),
            vec![Token::array(), Token::number("3"), Token::end_array()]
        );
    }
}
