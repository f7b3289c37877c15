//! Forward-only token readers.
//!
//! [`JsonReader`] is the pull interface every token source implements: the
//! text tokenizer, buffer replay, and the free-order member reader. A fresh
//! reader is positioned at `Bof`; [`JsonReader::read`] advances one token at
//! a time and returns `false` once `Eof` is reached.

mod buffer;
mod member;
mod text;

use std::sync::Arc;

pub use buffer::JsonBufferReader;
pub use member::{MemberReader, MemberValue, TailMemberReader};
pub use text::JsonTextReader;

use crate::{
    error::ReadError,
    token::{Token, TokenClass},
};

/// A lazy, forward-only sequence of JSON tokens.
///
/// The required surface is tiny; the provided methods are the typed pulls
/// converters are written against. All of the `read_*` helpers position the
/// reader *after* the token they return, so a value is consumed exactly once.
pub trait JsonReader {
    /// Advances to the next token. Returns `false` once the end of the
    /// stream has been reached.
    fn read(&mut self) -> Result<bool, ReadError>;

    /// The current token.
    fn token(&self) -> &Token;

    /// The number of currently open containers.
    fn depth(&self) -> usize;

    /// The current token's class.
    fn token_class(&self) -> TokenClass {
        self.token().class()
    }

    /// The current token's text, if any.
    fn text(&self) -> Option<&str> {
        self.token().text()
    }

    /// Returns `true` once the reader has produced `Eof`.
    fn eof(&self) -> bool {
        self.token_class() == TokenClass::Eof
    }

    /// Skips non-content artifacts (`Bof`, `Member`) so the reader sits on a
    /// value, terminator, or `Eof`. Returns `false` at `Eof`.
    fn move_to_content(&mut self) -> Result<bool, ReadError> {
        loop {
            match self.token_class() {
                TokenClass::Bof | TokenClass::Member => {
                    if !self.read()? {
                        return Ok(false);
                    }
                }
                _ => return Ok(!self.eof()),
            }
        }
    }

    /// Consumes one whole value: a scalar, `null`, or a balanced
    /// array/object, without materializing it.
    fn skip(&mut self) -> Result<(), ReadError> {
        self.move_to_content()?;
        match self.token_class() {
            TokenClass::Array | TokenClass::Object => {
                let mut level = 0usize;
                loop {
                    match self.token_class() {
                        TokenClass::Array | TokenClass::Object => level += 1,
                        TokenClass::EndArray | TokenClass::EndObject => {
                            level -= 1;
                            if level == 0 {
                                self.read()?;
                                return Ok(());
                            }
                        }
                        TokenClass::Eof => return Err(ReadError::UnexpectedEof),
                        _ => {}
                    }
                    if !self.read()? && level > 0 {
                        return Err(ReadError::UnexpectedEof);
                    }
                }
            }
            TokenClass::Eof => Err(ReadError::UnexpectedEof),
            _ => {
                self.read()?;
                Ok(())
            }
        }
    }

    /// Reads a token of exactly `class` and advances past it.
    fn read_token(&mut self, class: TokenClass) -> Result<Token, ReadError> {
        self.move_to_content()?;
        if self.token_class() != class {
            return Err(ReadError::UnexpectedToken {
                expected: class,
                found: self.token_class(),
            });
        }
        let token = self.token().clone();
        self.read()?;
        Ok(token)
    }

    /// Reads a `String` token's text.
    fn read_string(&mut self) -> Result<Arc<str>, ReadError> {
        Ok(self
            .read_token(TokenClass::String)?
            .text_arc()
            .unwrap_or_else(|| Arc::from("")))
    }

    /// Reads a `Number` token's text.
    fn read_number(&mut self) -> Result<Arc<str>, ReadError> {
        Ok(self
            .read_token(TokenClass::Number)?
            .text_arc()
            .unwrap_or_else(|| Arc::from("")))
    }

    /// Reads a `Boolean` token.
    fn read_boolean(&mut self) -> Result<bool, ReadError> {
        Ok(self.read_token(TokenClass::Boolean)?.text() == Some("true"))
    }

    /// Reads a `Null` token.
    fn read_null(&mut self) -> Result<(), ReadError> {
        self.read_token(TokenClass::Null).map(|_| ())
    }

    /// Reads a `Member` token's name.
    fn read_member(&mut self) -> Result<Arc<str>, ReadError> {
        // Members are skipped by move_to_content, so look before moving.
        if self.token_class() == TokenClass::Bof {
            self.read()?;
        }
        if self.token_class() != TokenClass::Member {
            return Err(ReadError::UnexpectedToken {
                expected: TokenClass::Member,
                found: self.token_class(),
            });
        }
        let name = self.token().text_arc().unwrap_or_else(|| Arc::from(""));
        self.read()?;
        Ok(name)
    }
}
