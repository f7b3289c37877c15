//! Reading object members out of wire order.
//!
//! [`MemberReader`] sits over a base reader positioned on an object and
//! serves members by name in whatever order the caller asks for them. A
//! request that matches the next member on the wire is served directly from
//! the base reader; members skipped along the way are captured into shared
//! buffer storage and replayed when their turn comes. Whatever was never
//! asked for remains available as a tail object.

use std::{collections::HashSet, rc::Rc, sync::Arc};

use crate::{
    buffer::{snapshot_value, BufferStorage, NamedBuffer},
    error::ReadError,
    reader::{JsonBufferReader, JsonReader},
    token::{Token, TokenClass},
};

/// A member value handed out by [`MemberReader`].
///
/// Either a window onto the base reader, positioned on the value, or a
/// replay of a value buffered while other members were being served. Both
/// read identically; consumers should consume exactly one value.
pub enum MemberValue<'b> {
    Direct(&'b mut dyn JsonReader),
    Buffered(JsonBufferReader),
}

impl JsonReader for MemberValue<'_> {
    fn read(&mut self) -> Result<bool, ReadError> {
        match self {
            Self::Direct(r) => r.read(),
            Self::Buffered(r) => r.read(),
        }
    }

    fn token(&self) -> &Token {
        match self {
            Self::Direct(r) => r.token(),
            Self::Buffered(r) => r.token(),
        }
    }

    fn depth(&self) -> usize {
        match self {
            Self::Direct(r) => r.depth(),
            Self::Buffered(r) => r.depth(),
        }
    }
}

/// Serves the members of one object by name, in any order.
///
/// Each member is served at most once. Buffered values share one token
/// storage, so skipping many members costs one growing array rather than an
/// allocation per member.
///
/// # Examples
///
/// ```
/// use jsonloom::{JsonReader, JsonTextReader, MemberReader};
///
/// let mut base = JsonTextReader::from_str(r#"{"y": 2, "x": 1}"#);
/// let mut members = MemberReader::new(&mut base).unwrap();
/// assert_eq!(&*members.read_member("x").unwrap().read_number().unwrap(), "1");
/// assert_eq!(&*members.read_member("y").unwrap().read_number().unwrap(), "2");
/// ```
pub struct MemberReader<'a> {
    base: &'a mut dyn JsonReader,
    storage: Rc<BufferStorage>,
    buffered: Vec<NamedBuffer>,
    served: HashSet<Arc<str>>,
    ended: bool,
}

impl<'a> MemberReader<'a> {
    /// Wraps `base`, which may be positioned on the `Object` token, on a
    /// `Member` already inside the object, or one token before the object
    /// (`Bof`, or an enclosing container mid-stream). The object token, when
    /// not already consumed, is consumed.
    pub fn new(base: &'a mut dyn JsonReader) -> Result<Self, ReadError> {
        match base.token_class() {
            // Already inside the object, on the next member to serve.
            TokenClass::Member => {}
            TokenClass::Object => {
                base.read()?;
            }
            _ => {
                base.read()?;
                if base.token_class() != TokenClass::Object {
                    return Err(ReadError::NotAnObject);
                }
                base.read()?;
            }
        }
        Ok(Self {
            base,
            storage: Rc::new(BufferStorage::new()),
            buffered: Vec::new(),
            served: HashSet::new(),
            ended: false,
        })
    }

    /// Serves the member called `name`, or `None` when the object has no
    /// such member or it has already been served.
    pub fn try_read_member(&mut self, name: &str) -> Result<Option<MemberValue<'_>>, ReadError> {
        if self.served.contains(name) {
            return Ok(None);
        }
        if let Some(pos) = self.buffered.iter().position(|m| m.name() == name) {
            // Keep the remaining buffered members in wire order for the tail.
            let member = self.buffered.remove(pos);
            self.served.insert(Arc::from(name));
            return Ok(Some(MemberValue::Buffered(member.buffer().read())));
        }
        while !self.ended {
            match self.base.token_class() {
                TokenClass::EndObject => {
                    self.ended = true;
                    break;
                }
                TokenClass::Member => {
                    let found = self.base.token().text_arc().unwrap_or_else(|| Arc::from(""));
                    self.base.read()?;
                    if &*found == name {
                        self.served.insert(found);
                        return Ok(Some(MemberValue::Direct(&mut *self.base)));
                    }
                    let value = snapshot_value(self.base, &self.storage)?;
                    self.buffered.push(NamedBuffer::new(found, value));
                }
                TokenClass::Eof => return Err(ReadError::UnexpectedEof),
                found => {
                    return Err(ReadError::UnexpectedToken {
                        expected: TokenClass::Member,
                        found,
                    });
                }
            }
        }
        Ok(None)
    }

    /// Serves the member called `name`, failing when it is absent.
    pub fn read_member(&mut self, name: &str) -> Result<MemberValue<'_>, ReadError> {
        match self.try_read_member(name)? {
            Some(value) => Ok(value),
            None => Err(ReadError::MemberNotFound(name.to_string())),
        }
    }

    /// The members buffered so far while other names were being served.
    #[must_use]
    pub fn buffered(&self) -> &[NamedBuffer] {
        &self.buffered
    }

    /// Consumes this reader, turning everything not yet served into an
    /// object of its own: buffered members are replayed first, then the
    /// base reader is drained up to the object's `EndObject`.
    #[must_use]
    pub fn tail_reader(self) -> TailMemberReader<'a> {
        let mut pending = vec![Token::object()];
        for member in &self.buffered {
            pending.push(Token::member(member.name()));
            let buffer = member.buffer();
            for i in 0..buffer.len() {
                pending.push(buffer.get(i));
            }
        }
        pending.reverse();
        TailMemberReader {
            base: self.base,
            pending,
            current: Token::bof(),
            depth: 0,
            level: 0,
            base_done: self.ended,
        }
    }
}

/// The unserved remainder of a [`MemberReader`]'s object, replayed as a
/// complete object of its own.
///
/// The base reader is left positioned on the original object's `EndObject`.
pub struct TailMemberReader<'a> {
    base: &'a mut dyn JsonReader,
    /// Buffered tokens in reverse, so replay pops from the end.
    pending: Vec<Token>,
    current: Token,
    depth: usize,
    /// Container nesting within the drained part of the base stream.
    level: usize,
    base_done: bool,
}

impl TailMemberReader<'_> {
    fn accept(&mut self, token: Token) -> bool {
        match token.class() {
            TokenClass::Array | TokenClass::Object => self.depth += 1,
            TokenClass::EndArray | TokenClass::EndObject => self.depth -= 1,
            _ => {}
        }
        self.current = token;
        !self.eof()
    }
}

impl JsonReader for TailMemberReader<'_> {
    fn read(&mut self) -> Result<bool, ReadError> {
        if self.eof() {
            return Ok(false);
        }
        if let Some(token) = self.pending.pop() {
            return Ok(self.accept(token));
        }
        if self.base_done {
            return Ok(self.accept(Token::eof()));
        }
        let token = self.base.token().clone();
        match token.class() {
            TokenClass::Array | TokenClass::Object => self.level += 1,
            TokenClass::EndArray | TokenClass::EndObject => {
                if self.level == 0 {
                    // The object's own terminator; the base reader stays on
                    // it rather than being read past the object.
                    self.base_done = true;
                    return Ok(self.accept(token));
                }
                self.level -= 1;
            }
            TokenClass::Bof | TokenClass::Eof => return Err(ReadError::UnexpectedEof),
            _ => {}
        }
        self.base.read()?;
        Ok(self.accept(token))
    }

    fn token(&self) -> &Token {
        &self.current
    }

    fn depth(&self) -> usize {
        self.depth
    }
}
