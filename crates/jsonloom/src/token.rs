//! The token model shared by readers, writers, and buffers.
//!
//! A [`Token`] is the atomic unit of JSON structure: a scalar value, a
//! structural marker such as an object or array boundary, or a member name.
//! Tokens flow from the tokenizer, into buffers, and through writers; every
//! other component in this crate is defined in terms of them.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

/// The classification of a [`Token`].
///
/// This is a closed enumeration: every token produced by a reader or accepted
/// by a writer belongs to exactly one of these classes.
///
/// # Examples
///
/// ```
/// use jsonloom::TokenClass;
///
/// assert!(TokenClass::Number.is_scalar());
/// assert!(TokenClass::EndArray.is_terminator());
/// assert!(!TokenClass::Member.is_scalar());
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    /// Before the first read; the initial state of every reader.
    Bof,
    /// After the last token; the final state of every reader.
    Eof,
    /// The JSON `null` literal.
    Null,
    /// A JSON `true` or `false` literal.
    Boolean,
    /// A JSON number, carried as text.
    Number,
    /// A JSON string.
    String,
    /// The start of a JSON array.
    Array,
    /// The end of a JSON array.
    EndArray,
    /// The start of a JSON object.
    Object,
    /// The end of a JSON object.
    EndObject,
    /// An object member name; the member's value follows.
    Member,
}

impl TokenClass {
    /// Returns `true` for the scalar classes: `Boolean`, `Number`, `String`.
    #[must_use]
    pub fn is_scalar(self) -> bool {
        matches!(self, Self::Boolean | Self::Number | Self::String)
    }

    /// Returns `true` for the terminator classes: `EndArray`, `EndObject`,
    /// `Bof`, `Eof`.
    #[must_use]
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::EndArray | Self::EndObject | Self::Bof | Self::Eof)
    }

    /// The display name of the class.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bof => "BOF",
            Self::Eof => "EOF",
            Self::Null => "Null",
            Self::Boolean => "Boolean",
            Self::Number => "Number",
            Self::String => "String",
            Self::Array => "Array",
            Self::EndArray => "EndArray",
            Self::Object => "Object",
            Self::EndObject => "EndObject",
            Self::Member => "Member",
        }
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single JSON token: a class plus an optional text payload.
///
/// `Number` and `String` tokens always carry text; `Member` text is the
/// member name; the structural classes carry none.
///
/// Two tokens are equal when their classes match and either side's text is
/// absent or the texts are equal, so a class-only token such as
/// `Token::member_any()` compares equal to any member token regardless of
/// payload. Because of that loose relation, `Token` implements [`Hash`] over
/// the class alone.
///
/// # Examples
///
/// ```
/// use jsonloom::{Token, TokenClass};
///
/// let n = Token::number("42");
/// assert_eq!(n.class(), TokenClass::Number);
/// assert_eq!(n.text(), Some("42"));
/// assert_eq!(n, Token::number("42"));
/// assert_ne!(n, Token::number("43"));
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Token {
    class: TokenClass,
    text: Option<Arc<str>>,
}

impl Token {
    /// A `Bof` token.
    #[must_use]
    pub fn bof() -> Self {
        Self { class: TokenClass::Bof, text: None }
    }

    /// An `Eof` token.
    #[must_use]
    pub fn eof() -> Self {
        Self { class: TokenClass::Eof, text: None }
    }

    /// A `Null` token.
    #[must_use]
    pub fn null() -> Self {
        Self { class: TokenClass::Null, text: None }
    }

    /// An `Array` start token.
    #[must_use]
    pub fn array() -> Self {
        Self { class: TokenClass::Array, text: None }
    }

    /// An `EndArray` token.
    #[must_use]
    pub fn end_array() -> Self {
        Self { class: TokenClass::EndArray, text: None }
    }

    /// An `Object` start token.
    #[must_use]
    pub fn object() -> Self {
        Self { class: TokenClass::Object, text: None }
    }

    /// An `EndObject` token.
    #[must_use]
    pub fn end_object() -> Self {
        Self { class: TokenClass::EndObject, text: None }
    }

    /// A `Boolean` token carrying `true` or `false` text.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self {
            class: TokenClass::Boolean,
            text: Some(Arc::from(if value { "true" } else { "false" })),
        }
    }

    /// A `Number` token; `text` is the number's textual form.
    #[must_use]
    pub fn number(text: impl Into<Arc<str>>) -> Self {
        Self { class: TokenClass::Number, text: Some(text.into()) }
    }

    /// A `String` token.
    #[must_use]
    pub fn string(text: impl Into<Arc<str>>) -> Self {
        Self { class: TokenClass::String, text: Some(text.into()) }
    }

    /// A `Member` token; `name` is the member name.
    #[must_use]
    pub fn member(name: impl Into<Arc<str>>) -> Self {
        Self { class: TokenClass::Member, text: Some(name.into()) }
    }

    /// A `Member` token with no payload; equal to any member token.
    #[must_use]
    pub fn member_any() -> Self {
        Self { class: TokenClass::Member, text: None }
    }

    /// The token's class.
    #[must_use]
    pub fn class(&self) -> TokenClass {
        self.class
    }

    /// The token's text payload, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The token's text payload as a shared string, if any.
    #[must_use]
    pub fn text_arc(&self) -> Option<Arc<str>> {
        self.text.clone()
    }

    /// Returns `true` if this token's class is scalar.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.class.is_scalar()
    }

    /// Returns `true` if this token's class is a terminator.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        self.class.is_terminator()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
            && match (&self.text, &other.text) {
                (None, _) | (_, None) => true,
                (Some(a), Some(b)) => a == b,
            }
    }
}

// Hash must agree with the loose equality above, so only the class
// participates.
impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(text) => write!(f, "{}:{text}", self.class),
            None => self.class.fmt(f),
        }
    }
}

/// Returns `true` when `text` is valid JSON number text per the RFC 4627
/// grammar. Number tokens always carry text in this form; writers reject
/// anything else.
pub(crate) fn is_number_text(text: &str) -> bool {
    let b = text.as_bytes();
    let mut i = 0;
    if b.first() == Some(&b'-') {
        i = 1;
    }
    match b.get(i) {
        Some(b'0') => i += 1,
        Some(c) if c.is_ascii_digit() => {
            while b.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
        }
        _ => return false,
    }
    if b.get(i) == Some(&b'.') {
        i += 1;
        if !b.get(i).is_some_and(u8::is_ascii_digit) {
            return false;
        }
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(b.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if !b.get(i).is_some_and(u8::is_ascii_digit) {
            return false;
        }
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
    }
    i == b.len()
}

#[cfg(test)]
mod tests {
    use std::hash::{DefaultHasher, Hash, Hasher};

    use super::*;

    fn hash_of(token: &Token) -> u64 {
        let mut h = DefaultHasher::new();
        token.hash(&mut h);
        h.finish()
    }

    #[test]
    fn equality_requires_matching_class() {
        assert_ne!(Token::number("1"), Token::string("1"));
        assert_ne!(Token::array(), Token::object());
    }

    #[test]
    fn equality_ignores_text_when_absent() {
        assert_eq!(Token::member_any(), Token::member("anything"));
        assert_eq!(Token::member("anything"), Token::member_any());
        assert_ne!(Token::member("a"), Token::member("b"));
    }

    #[test]
    fn hash_is_class_only() {
        assert_eq!(hash_of(&Token::member("a")), hash_of(&Token::member_any()));
        assert_eq!(hash_of(&Token::number("1")), hash_of(&Token::number("2")));
        assert_ne!(hash_of(&Token::array()), hash_of(&Token::object()));
    }

    #[test]
    fn classifications() {
        assert!(Token::boolean(true).is_scalar());
        assert!(Token::number("0").is_scalar());
        assert!(Token::string("").is_scalar());
        assert!(!Token::null().is_scalar());
        assert!(Token::eof().is_terminator());
        assert!(Token::end_object().is_terminator());
        assert!(!Token::member("m").is_terminator());
    }

    #[test]
    fn display() {
        assert_eq!(Token::number("1.5").to_string(), "Number:1.5");
        assert_eq!(Token::end_array().to_string(), "EndArray");
    }
}
