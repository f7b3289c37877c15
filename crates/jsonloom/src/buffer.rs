//! Immutable token buffers with copy-free structural slicing.
//!
//! A [`JsonBuffer`] is a `(storage, start, end)` view over a shared,
//! append-only token array. Buffers capture a complete JSON value so it can
//! be replayed, sliced, compared, or deferred; sub-slicing a structured
//! buffer is O(1) and never copies tokens.

use std::{
    cell::RefCell,
    fmt,
    hash::{DefaultHasher, Hash, Hasher},
    rc::Rc,
    sync::Arc,
};

use crate::{
    error::ReadError,
    reader::{JsonBufferReader, JsonReader, JsonTextReader},
    token::{Token, TokenClass},
    writer::{JsonTextWriter, JsonWriter},
};

/// Append-only token array shared by every [`JsonBuffer`] sliced from it.
///
/// Storage never shrinks and lives as long as any buffer referencing it, so
/// holding onto a small slice keeps the whole backing array alive.
#[derive(Debug, Default)]
pub(crate) struct BufferStorage {
    tokens: RefCell<Vec<Token>>,
}

impl BufferStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.borrow().len()
    }

    pub(crate) fn push(&self, token: Token) {
        self.tokens.borrow_mut().push(token);
    }

    pub(crate) fn get(&self, index: usize) -> Token {
        self.tokens.borrow()[index].clone()
    }
}

thread_local! {
    static EMPTY: JsonBuffer = JsonBuffer {
        storage: Rc::new(BufferStorage::new()),
        start: 0,
        end: 0,
    };
    static NULL_VALUE: JsonBuffer = JsonBuffer::of(Token::null());
    static TRUE_VALUE: JsonBuffer = JsonBuffer::of(Token::boolean(true));
    static FALSE_VALUE: JsonBuffer = JsonBuffer::of(Token::boolean(false));
}

/// An immutable view over a captured JSON value.
///
/// A buffer is classified as *empty* (length zero), *null* (a single `Null`
/// token), *scalar* (a single scalar token), or *structured* (anything else,
/// beginning with `Array` or `Object`).
///
/// # Examples
///
/// ```
/// use jsonloom::JsonBuffer;
///
/// let buffer = JsonBuffer::parse("[1, 2, 3]").unwrap();
/// assert!(buffer.is_structured());
/// assert_eq!(buffer.to_string(), "[1,2,3]");
///
/// // Slice out the first element (index 1 skips the Array token).
/// let first = buffer.slice(1, 2);
/// assert!(first.is_scalar());
/// assert_eq!(first.to_string(), "1");
/// ```
#[derive(Debug, Clone)]
pub struct JsonBuffer {
    storage: Rc<BufferStorage>,
    start: usize,
    end: usize,
}

impl JsonBuffer {
    fn of(token: Token) -> Self {
        let storage = Rc::new(BufferStorage::new());
        storage.push(token);
        Self { storage, start: 0, end: 1 }
    }

    pub(crate) fn over(storage: Rc<BufferStorage>, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= storage.len());
        Self { storage, start, end }
    }

    /// The shared empty buffer.
    #[must_use]
    pub fn empty() -> Self {
        EMPTY.with(Clone::clone)
    }

    /// The shared singleton buffer holding `null`.
    #[must_use]
    pub fn null_value() -> Self {
        NULL_VALUE.with(Clone::clone)
    }

    /// The shared singleton buffer holding `true`.
    #[must_use]
    pub fn true_value() -> Self {
        TRUE_VALUE.with(Clone::clone)
    }

    /// The shared singleton buffer holding `false`.
    #[must_use]
    pub fn false_value() -> Self {
        FALSE_VALUE.with(Clone::clone)
    }

    /// Captures the value the reader is positioned on (or before).
    ///
    /// Scalar `null`/`true`/`false` values come back as the shared
    /// singletons; everything else is copied into fresh storage. The reader
    /// is left positioned after the value.
    pub fn from_reader(reader: &mut dyn JsonReader) -> Result<Self, ReadError> {
        snapshot_value(reader, &Rc::new(BufferStorage::new()))
    }

    /// Parses JSON text into a buffer.
    pub fn parse(text: &str) -> Result<Self, ReadError> {
        Self::from_reader(&mut JsonTextReader::from_str(text))
    }

    /// Number of tokens in this view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` when the view holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` for a single `Null` token.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.len() == 1 && self.get(0).class() == TokenClass::Null
    }

    /// Returns `true` for a single scalar token.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.len() == 1 && self.get(0).is_scalar()
    }

    /// Returns `true` for a buffer beginning with `Array` or `Object`.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        !self.is_empty() && !self.is_null() && !self.is_scalar()
    }

    /// The token at `index` within this view.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Token {
        assert!(index < self.len(), "token index {index} out of range");
        self.storage.get(self.start + index)
    }

    /// A sub-view of this buffer.
    ///
    /// On a structured buffer this offsets into the shared storage without
    /// copying. On a non-structured buffer only the full range `[0, len)` is
    /// legal and returns the whole value.
    ///
    /// # Panics
    ///
    /// Panics when the range is out of bounds, or when a proper sub-range of
    /// a non-structured buffer is requested.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Self {
        assert!(start <= end && end <= self.len(), "slice range out of bounds");
        if !self.is_structured() {
            assert!(
                start == 0 && end == self.len(),
                "a non-structured buffer can only be sliced whole"
            );
            return self.clone();
        }
        Self {
            storage: Rc::clone(&self.storage),
            start: self.start + start,
            end: self.start + end,
        }
    }

    /// A reader that replays this buffer's tokens.
    #[must_use]
    pub fn read(&self) -> JsonBufferReader {
        JsonBufferReader::new(self.clone())
    }

    /// Splits an object buffer into its members, each a [`NamedBuffer`]
    /// slicing into this buffer's storage.
    pub fn members(&self) -> Result<Vec<NamedBuffer>, ReadError> {
        if self.is_empty() || self.get(0).class() != TokenClass::Object {
            return Err(ReadError::NotAnObject);
        }
        let mut members = Vec::new();
        let mut i = 1;
        loop {
            let token = self.get(i);
            match token.class() {
                TokenClass::EndObject => break,
                TokenClass::Member => {
                    let name = token.text_arc().unwrap_or_else(|| Arc::from(""));
                    i += 1;
                    let start = i;
                    let end = self.end_of_value_at(i)?;
                    members.push(NamedBuffer::new(name, self.slice(start, end)));
                    i = end;
                }
                other => return Err(ReadError::NotAValue(other)),
            }
        }
        Ok(members)
    }

    /// Index one past the value starting at `index`.
    fn end_of_value_at(&self, index: usize) -> Result<usize, ReadError> {
        let mut i = index;
        let mut level = 0usize;
        loop {
            if i >= self.len() {
                return Err(ReadError::UnexpectedEof);
            }
            match self.get(i).class() {
                TokenClass::Array | TokenClass::Object => level += 1,
                TokenClass::EndArray | TokenClass::EndObject => level -= 1,
                c if c.is_scalar() || c == TokenClass::Null => {}
                TokenClass::Member => {}
                other => return Err(ReadError::NotAValue(other)),
            }
            i += 1;
            if level == 0 {
                return Ok(i);
            }
        }
    }

    /// Writes this buffer's value to `writer`.
    pub fn write_to(&self, writer: &mut dyn JsonWriter) -> Result<(), crate::convert::ConvertError> {
        writer.write_from_reader(&mut self.read())
    }
}

/// Structural, token-by-token comparison.
impl PartialEq for JsonBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && (0..self.len()).all(|i| self.get(i) == other.get(i))
    }
}

/// XOR of the token hashes, so the hash is cheap and order-insensitive.
impl Hash for JsonBuffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut acc = 0u64;
        for i in 0..self.len() {
            let mut h = DefaultHasher::new();
            self.get(i).hash(&mut h);
            acc ^= h.finish();
        }
        state.write_u64(acc);
    }
}

impl fmt::Display for JsonBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = JsonTextWriter::new(Vec::new());
        self.write_to(&mut writer).map_err(|_| fmt::Error)?;
        writer.close().map_err(|_| fmt::Error)?;
        let bytes = writer.into_inner();
        f.write_str(std::str::from_utf8(&bytes).map_err(|_| fmt::Error)?)
    }
}

/// A member name paired with its buffered value.
///
/// A named buffer is never empty; the [`NamedBuffer::empty`] sentinel (empty
/// name, empty buffer) marks absence.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedBuffer {
    name: Arc<str>,
    buffer: JsonBuffer,
}

impl NamedBuffer {
    /// Pairs `name` with `buffer`.
    ///
    /// # Panics
    ///
    /// Panics when `buffer` is empty; use [`NamedBuffer::empty`] for the
    /// absence sentinel.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, buffer: JsonBuffer) -> Self {
        assert!(!buffer.is_empty(), "a named buffer requires a non-empty value");
        Self { name: name.into(), buffer }
    }

    /// The sentinel named buffer: empty name, empty buffer.
    #[must_use]
    pub fn empty() -> Self {
        Self { name: Arc::from(""), buffer: JsonBuffer::empty() }
    }

    /// The member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The member value.
    #[must_use]
    pub fn buffer(&self) -> &JsonBuffer {
        &self.buffer
    }

    /// Returns `true` for the sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl fmt::Display for NamedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.buffer)
    }
}

/// Captures the reader's current value into `storage`, returning a slice
/// over it. Shared singletons are returned for `null`, `true`, and `false`
/// so that repeated scalar snapshots do not grow the storage.
pub(crate) fn snapshot_value(
    reader: &mut dyn JsonReader,
    storage: &Rc<BufferStorage>,
) -> Result<JsonBuffer, ReadError> {
    reader.move_to_content()?;
    let token = reader.token().clone();
    match token.class() {
        TokenClass::Null => {
            reader.read()?;
            Ok(JsonBuffer::null_value())
        }
        TokenClass::Boolean => {
            reader.read()?;
            Ok(if token.text() == Some("true") {
                JsonBuffer::true_value()
            } else {
                JsonBuffer::false_value()
            })
        }
        TokenClass::Number | TokenClass::String => {
            let start = storage.len();
            storage.push(token);
            reader.read()?;
            Ok(JsonBuffer::over(Rc::clone(storage), start, start + 1))
        }
        TokenClass::Array | TokenClass::Object => {
            let start = storage.len();
            let mut level = 0usize;
            loop {
                let token = reader.token().clone();
                match token.class() {
                    TokenClass::Array | TokenClass::Object => level += 1,
                    TokenClass::EndArray | TokenClass::EndObject => level -= 1,
                    TokenClass::Bof | TokenClass::Eof => return Err(ReadError::UnexpectedEof),
                    _ => {}
                }
                storage.push(token);
                reader.read()?;
                if level == 0 {
                    break;
                }
            }
            Ok(JsonBuffer::over(Rc::clone(storage), start, storage.len()))
        }
        other => Err(ReadError::NotAValue(other)),
    }
}
