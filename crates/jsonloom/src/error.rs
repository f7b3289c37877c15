//! Error types for reading and writing JSON text and token streams.

use std::{fmt, io};

use thiserror::Error;

use crate::token::TokenClass;

/// A position within JSON text.
///
/// Lines and columns are 1-based; `char_count` is the number of characters
/// consumed from the start of the input.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub char_count: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A lexical error raised by the tokenizer, carrying the position at which
/// the malformed input was found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at {location}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub location: Location,
}

/// The kinds of lexical error the tokenizer can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("invalid unicode escape sequence")]
    InvalidUnicodeEscape,
    #[error("expected {0}")]
    Expected(&'static str),
}

/// An error raised while reading a token stream.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("i/o error reading JSON text: {0}")]
    Io(#[from] io::Error),
    #[error("found {found} where {expected} was expected")]
    UnexpectedToken {
        expected: TokenClass,
        found: TokenClass,
    },
    #[error("unexpected end of the token stream")]
    UnexpectedEof,
    #[error("found {0} where a value was expected")]
    NotAValue(TokenClass),
    #[error("member '{0}' not found")]
    MemberNotFound(String),
    #[error("the reader is not positioned on a JSON object")]
    NotAnObject,
    #[error("the reader failed previously and cannot continue")]
    Failed,
    #[error("malformed token stream: {0}")]
    TokenStream(#[from] WriteError),
}

/// An error raised while writing, either structural (the call would produce
/// malformed JSON) or from the underlying sink.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("i/o error writing JSON text: {0}")]
    Io(#[from] io::Error),
    #[error("a value may not be written inside an object without a member name")]
    MissingMember,
    #[error("a member name may only be written inside an object")]
    MemberOutsideObject,
    #[error("no open {expected} to close")]
    BracketMismatch { expected: &'static str },
    #[error("a bracket is still open")]
    UnclosedBracket,
    #[error("maximum writing depth of {0} exceeded")]
    DepthExceeded(usize),
    #[error("the document already has a top-level value")]
    DocumentComplete,
    #[error("the writer is closed")]
    Closed,
    #[error("invalid number text '{0}'")]
    InvalidNumber(String),
}
