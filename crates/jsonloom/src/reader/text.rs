//! The streaming tokenizer over JSON text.
//!
//! Parsing state is an explicit stack of [`Scan`] continuations rather than
//! recursive descent, so nesting depth is bounded by available heap instead
//! of the call stack. Each step consumes characters, may push the
//! continuation to resume at, and produces exactly one token.
//!
//! Read-side leniency beyond RFC 4627 is always on: `//`, `/* */`, and `#`
//! comments, single-quoted and unquoted strings, unquoted member names,
//! `=>` as a member separator, `;` as an element separator, trailing
//! separators, and `0x`/leading-zero numeric literals.

use std::io;

use log::trace;

use crate::{
    error::{ReadError, SyntaxError, SyntaxErrorKind},
    reader::JsonReader,
    source::CharSource,
    token::{is_number_text, Token},
};

/// Grammar continuations. `Value` parses any value; the others resume an
/// open container at the next element or member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Value,
    ArrayFirst,
    ArrayNext,
    ObjectFirst,
    ObjectNext,
}

/// A pull tokenizer over JSON text.
///
/// Reads one top-level value; after it, the reader reports `Eof` and leaves
/// any remaining input untouched. A syntax error is fatal for the reader.
///
/// # Examples
///
/// ```
/// use jsonloom::{JsonReader, JsonTextReader, TokenClass};
///
/// let mut reader = JsonTextReader::from_str("{\"a\": [1, 2]}");
/// reader.read().unwrap();
/// assert_eq!(reader.token_class(), TokenClass::Object);
/// reader.read().unwrap();
/// assert_eq!(reader.token_class(), TokenClass::Member);
/// assert_eq!(reader.text(), Some("a"));
/// ```
pub struct JsonTextReader<R: io::Read> {
    source: CharSource<R>,
    current: Token,
    stack: Vec<Scan>,
    depth: usize,
    started: bool,
    dead: bool,
}

impl JsonTextReader<io::Cursor<Vec<u8>>> {
    /// A reader over in-memory text.
    #[must_use]
    pub fn from_str(text: &str) -> Self {
        Self::new(io::Cursor::new(text.as_bytes().to_vec()))
    }
}

impl<R: io::Read> JsonTextReader<R> {
    /// A reader over any character stream.
    pub fn new(inner: R) -> Self {
        Self {
            source: CharSource::new(inner),
            current: Token::bof(),
            stack: Vec::new(),
            depth: 0,
            started: false,
            dead: false,
        }
    }

    fn syntax(&self, kind: SyntaxErrorKind) -> ReadError {
        ReadError::Syntax(SyntaxError {
            kind,
            location: self.source.location(),
        })
    }

    fn next_token(&mut self) -> Result<Token, ReadError> {
        if !self.started {
            self.started = true;
            self.stack.push(Scan::Value);
        }
        match self.stack.pop() {
            None => Ok(Token::eof()),
            Some(Scan::Value) => self.scan_value(),
            Some(Scan::ArrayFirst) => self.scan_array(true),
            Some(Scan::ArrayNext) => self.scan_array(false),
            Some(Scan::ObjectFirst) => self.scan_object(true),
            Some(Scan::ObjectNext) => self.scan_object(false),
        }
    }

    fn scan_value(&mut self) -> Result<Token, ReadError> {
        self.skip_blank()?;
        let Some(ch) = self.source.next()? else {
            if self.depth == 0 && self.stack.is_empty() {
                // Empty input parses to an immediate end of stream.
                return Ok(Token::eof());
            }
            return Err(self.syntax(SyntaxErrorKind::UnexpectedEndOfInput));
        };
        match ch {
            '{' => {
                self.depth += 1;
                self.stack.push(Scan::ObjectFirst);
                Ok(Token::object())
            }
            '[' => {
                self.depth += 1;
                self.stack.push(Scan::ArrayFirst);
                Ok(Token::array())
            }
            '"' | '\'' => Ok(Token::string(self.scan_quoted(ch)?)),
            _ => {
                self.source.back();
                self.scan_literal()
            }
        }
    }

    fn scan_array(&mut self, first: bool) -> Result<Token, ReadError> {
        self.skip_blank()?;
        let Some(ch) = self.source.next()? else {
            return Err(self.syntax(SyntaxErrorKind::UnexpectedEndOfInput));
        };
        if ch == ']' {
            self.depth -= 1;
            return Ok(Token::end_array());
        }
        if first {
            self.source.back();
        } else {
            if ch != ',' && ch != ';' {
                return Err(self.syntax(SyntaxErrorKind::Expected("',' or ']'")));
            }
            self.skip_blank()?;
            match self.source.next()? {
                // A trailing separator before the closing bracket is legal.
                Some(']') => {
                    self.depth -= 1;
                    return Ok(Token::end_array());
                }
                Some(_) => self.source.back(),
                None => return Err(self.syntax(SyntaxErrorKind::UnexpectedEndOfInput)),
            }
        }
        self.stack.push(Scan::ArrayNext);
        self.scan_value()
    }

    fn scan_object(&mut self, first: bool) -> Result<Token, ReadError> {
        self.skip_blank()?;
        let Some(ch) = self.source.next()? else {
            return Err(self.syntax(SyntaxErrorKind::UnexpectedEndOfInput));
        };
        if ch == '}' {
            self.depth -= 1;
            return Ok(Token::end_object());
        }
        if first {
            self.source.back();
        } else {
            if ch != ',' && ch != ';' {
                return Err(self.syntax(SyntaxErrorKind::Expected("',' or '}'")));
            }
            self.skip_blank()?;
            match self.source.next()? {
                Some('}') => {
                    self.depth -= 1;
                    return Ok(Token::end_object());
                }
                Some(_) => self.source.back(),
                None => return Err(self.syntax(SyntaxErrorKind::UnexpectedEndOfInput)),
            }
        }

        self.skip_blank()?;
        let Some(ch) = self.source.next()? else {
            return Err(self.syntax(SyntaxErrorKind::UnexpectedEndOfInput));
        };
        let name = match ch {
            '"' | '\'' => self.scan_quoted(ch)?,
            _ => {
                self.source.back();
                self.scan_unquoted_text()?
            }
        };

        self.skip_blank()?;
        match self.source.next()? {
            Some(':') => {}
            Some('=') => {
                if self.source.next()? != Some('>') {
                    return Err(self.syntax(SyntaxErrorKind::Expected("'=>'")));
                }
            }
            Some(_) | None => return Err(self.syntax(SyntaxErrorKind::Expected("':' or '=>'"))),
        }

        self.stack.push(Scan::ObjectNext);
        self.stack.push(Scan::Value);
        Ok(Token::member(name))
    }

    fn scan_literal(&mut self) -> Result<Token, ReadError> {
        let text = self.scan_unquoted_text()?;
        Ok(match text.as_str() {
            "true" => Token::boolean(true),
            "false" => Token::boolean(false),
            "null" => Token::null(),
            _ => match number_text(&text) {
                Some(number) => Token::number(number),
                None => Token::string(text),
            },
        })
    }

    /// Accumulates unquoted text up to the next structural character,
    /// whitespace, or end of input.
    fn scan_unquoted_text(&mut self) -> Result<String, ReadError> {
        let mut text = String::new();
        loop {
            match self.source.next()? {
                None => break,
                Some(ch) if is_delimiter(ch) => {
                    self.source.back();
                    break;
                }
                Some(ch) => text.push(ch),
            }
        }
        if text.is_empty() {
            return Err(match self.source.next()? {
                Some(ch) => self.syntax(SyntaxErrorKind::UnexpectedCharacter(ch)),
                None => self.syntax(SyntaxErrorKind::UnexpectedEndOfInput),
            });
        }
        Ok(text)
    }

    fn scan_quoted(&mut self, quote: char) -> Result<String, ReadError> {
        let mut text = String::new();
        loop {
            let Some(ch) = self.source.next()? else {
                return Err(self.syntax(SyntaxErrorKind::UnterminatedString));
            };
            if ch == quote {
                return Ok(text);
            }
            if ch != '\\' {
                text.push(ch);
                continue;
            }
            let Some(escape) = self.source.next()? else {
                return Err(self.syntax(SyntaxErrorKind::UnterminatedString));
            };
            text.push(match escape {
                'b' => '\u{0008}',
                'f' => '\u{000C}',
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                'u' => self.scan_unicode_escape()?,
                // Unknown escapes pass the escaped character through,
                // which also covers \" \' \\ and \/.
                other => other,
            });
        }
    }

    fn scan_unicode_escape(&mut self) -> Result<char, ReadError> {
        let unit = self.scan_hex4()?;
        if (0xDC00..=0xDFFF).contains(&unit) {
            // A low surrogate with no preceding high surrogate.
            return Err(self.syntax(SyntaxErrorKind::InvalidUnicodeEscape));
        }
        if (0xD800..=0xDBFF).contains(&unit) {
            if self.source.next()? != Some('\\') || self.source.next()? != Some('u') {
                return Err(self.syntax(SyntaxErrorKind::InvalidUnicodeEscape));
            }
            let low = self.scan_hex4()?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(self.syntax(SyntaxErrorKind::InvalidUnicodeEscape));
            }
            let code = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
            return char::from_u32(code)
                .ok_or_else(|| self.syntax(SyntaxErrorKind::InvalidUnicodeEscape));
        }
        char::from_u32(unit).ok_or_else(|| self.syntax(SyntaxErrorKind::InvalidUnicodeEscape))
    }

    fn scan_hex4(&mut self) -> Result<u32, ReadError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let digit = self
                .source
                .next()?
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.syntax(SyntaxErrorKind::InvalidUnicodeEscape))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    /// Skips whitespace and the three comment forms between tokens.
    fn skip_blank(&mut self) -> Result<(), ReadError> {
        loop {
            let Some(ch) = self.source.next()? else {
                return Ok(());
            };
            match ch {
                c if c.is_whitespace() => {}
                '#' => self.skip_line_comment()?,
                '/' => match self.source.next()? {
                    Some('/') => self.skip_line_comment()?,
                    Some('*') => self.skip_block_comment()?,
                    _ => return Err(self.syntax(SyntaxErrorKind::UnexpectedCharacter('/'))),
                },
                _ => {
                    self.source.back();
                    return Ok(());
                }
            }
        }
    }

    fn skip_line_comment(&mut self) -> Result<(), ReadError> {
        while let Some(ch) = self.source.next()? {
            if ch == '\n' {
                break;
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), ReadError> {
        let mut star = false;
        loop {
            match self.source.next()? {
                None => return Err(self.syntax(SyntaxErrorKind::UnterminatedComment)),
                Some('/') if star => return Ok(()),
                Some(ch) => star = ch == '*',
            }
        }
    }
}

impl<R: io::Read> JsonReader for JsonTextReader<R> {
    fn read(&mut self) -> Result<bool, ReadError> {
        if self.dead {
            return Err(ReadError::Failed);
        }
        if self.eof() {
            return Ok(false);
        }
        match self.next_token() {
            Ok(token) => {
                trace!("token: {token}");
                self.current = token;
                Ok(!self.eof())
            }
            Err(e) => {
                self.dead = true;
                Err(e)
            }
        }
    }

    fn token(&self) -> &Token {
        &self.current
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            ',' | ':' | ']' | '}' | '/' | '"' | '[' | '{' | ';' | '=' | '#'
        )
}

/// Normalizes literal text to JSON number text, or `None` when the literal
/// is not numeric. `0x` hex and leading-zero octal literals are converted to
/// decimal; overflowing ones fall back to `None` so the caller treats the
/// text as a string.
fn number_text(text: &str) -> Option<String> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return u64::from_str_radix(hex, 16).ok().map(|v| v.to_string());
    }
    if text.len() > 1 && text.starts_with('0') && text.chars().all(|c| ('0'..='7').contains(&c)) {
        return u64::from_str_radix(text, 8).ok().map(|v| v.to_string());
    }
    is_number_text(text).then(|| text.to_string())
}
