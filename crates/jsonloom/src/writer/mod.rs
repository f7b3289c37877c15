//! Forward-only token writers.
//!
//! [`JsonWriter`] is the push interface mirroring [`JsonReader`]: text and
//! buffer backends share [`WriterState`], the bracket state machine that
//! rejects any call which would produce malformed JSON. The backends only
//! render; legality lives here.

mod buffer;
mod text;

pub use buffer::JsonBufferWriter;
pub use text::JsonTextWriter;

use crate::{
    convert::ConvertError,
    error::{ReadError, WriteError},
    reader::JsonReader,
    token::TokenClass,
};

/// Knobs shared by the writer backends.
#[derive(Debug, Clone, Copy)]
pub struct WriterSettings {
    /// Emit newlines and indentation.
    pub pretty: bool,
    /// Spaces per nesting level when pretty printing.
    pub indent: usize,
    /// Maximum container nesting accepted before `DepthExceeded`.
    pub max_depth: usize,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: 4,
            max_depth: 30,
        }
    }
}

/// The two container brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bracket {
    Array,
    Object,
}

/// Where the next piece of output lands, for separator rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// The document's top-level value.
    Root,
    /// First entry of a container.
    First,
    /// A later entry of a container, preceded by a separator.
    Next,
    /// The value following a member name.
    MemberValue,
}

#[derive(Debug, Clone, Copy)]
enum FrameKind {
    Root,
    Array { auto: bool },
    Object,
    Member,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// Completed children (elements, or members of an object).
    index: usize,
}

/// The bracket state machine shared by every writer backend.
///
/// One frame per open container plus a permanent root frame; a `Member`
/// frame sits on top between a member name and its value. A scalar written
/// at the root is wrapped in an array opened here (`auto`) and closed by
/// [`WriterState::close`].
#[derive(Debug)]
pub(crate) struct WriterState {
    frames: Vec<Frame>,
    max_depth: usize,
    closed: bool,
}

impl WriterState {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            frames: vec![Frame { kind: FrameKind::Root, index: 0 }],
            max_depth,
            closed: false,
        }
    }

    fn top(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn guard(&self) -> Result<(), WriteError> {
        if self.closed {
            return Err(WriteError::Closed);
        }
        Ok(())
    }

    /// Open containers, the auto array included.
    pub(crate) fn depth(&self) -> usize {
        self.frames
            .iter()
            .filter(|f| matches!(f.kind, FrameKind::Array { .. } | FrameKind::Object))
            .count()
    }

    /// Completed children of the innermost open scope.
    pub(crate) fn index(&self) -> usize {
        self.top().index
    }

    /// Validates that a value may be written here. Returns the slot it lands
    /// in and whether an auto array was opened to hold a root scalar.
    pub(crate) fn stage_value(&mut self, is_scalar: bool) -> Result<(Slot, bool), WriteError> {
        self.guard()?;
        let slot = match self.top().kind {
            FrameKind::Member => return Ok((Slot::MemberValue, false)),
            FrameKind::Object => return Err(WriteError::MissingMember),
            FrameKind::Array { .. } => {
                if self.top().index == 0 {
                    Slot::First
                } else {
                    Slot::Next
                }
            }
            FrameKind::Root => {
                if self.top().index > 0 {
                    return Err(WriteError::DocumentComplete);
                }
                if is_scalar {
                    self.frames.push(Frame {
                        kind: FrameKind::Array { auto: true },
                        index: 0,
                    });
                    return Ok((Slot::Root, true));
                }
                Slot::Root
            }
        };
        Ok((slot, false))
    }

    /// Bookkeeping after a value has been rendered.
    pub(crate) fn commit_value(&mut self) {
        if matches!(self.top().kind, FrameKind::Member) {
            self.frames.pop();
        }
        self.top_mut().index += 1;
    }

    /// Validates that a container may open here, without opening it; the
    /// matching [`WriterState::commit_container`] pushes the frame once the
    /// backend has rendered the bracket.
    pub(crate) fn stage_container(&mut self) -> Result<Slot, WriteError> {
        let (slot, _) = self.stage_value(false)?;
        if self.depth() >= self.max_depth {
            return Err(WriteError::DepthExceeded(self.max_depth));
        }
        Ok(slot)
    }

    pub(crate) fn commit_container(&mut self, bracket: Bracket) {
        self.frames.push(Frame {
            kind: match bracket {
                Bracket::Array => FrameKind::Array { auto: false },
                Bracket::Object => FrameKind::Object,
            },
            index: 0,
        });
    }

    /// Pops the matching container, returning how many children it held.
    pub(crate) fn pop_container(&mut self, bracket: Bracket) -> Result<usize, WriteError> {
        self.guard()?;
        match (self.top().kind, bracket) {
            (FrameKind::Member, _) => Err(WriteError::MissingMember),
            (FrameKind::Array { auto: false }, Bracket::Array) | (FrameKind::Object, Bracket::Object) => {
                let children = self.top().index;
                self.frames.pop();
                self.commit_value();
                Ok(children)
            }
            (_, Bracket::Array) => Err(WriteError::BracketMismatch { expected: "array" }),
            (_, Bracket::Object) => Err(WriteError::BracketMismatch { expected: "object" }),
        }
    }

    pub(crate) fn stage_member(&mut self) -> Result<Slot, WriteError> {
        self.guard()?;
        match self.top().kind {
            FrameKind::Object => Ok(if self.top().index == 0 {
                Slot::First
            } else {
                Slot::Next
            }),
            _ => Err(WriteError::MemberOutsideObject),
        }
    }

    pub(crate) fn commit_member(&mut self) {
        self.top_mut().index += 1;
        self.frames.push(Frame { kind: FrameKind::Member, index: 0 });
    }

    /// Finishes the document. Returns `true` when the backend still has to
    /// render the auto array's closing bracket. Idempotent.
    pub(crate) fn close(&mut self) -> Result<bool, WriteError> {
        if self.closed {
            return Ok(false);
        }
        let auto_open = matches!(self.top().kind, FrameKind::Array { auto: true });
        if self.frames.len() > 1 + usize::from(auto_open) {
            return Err(WriteError::UnclosedBracket);
        }
        self.closed = true;
        Ok(auto_open)
    }
}

/// A push sink for JSON tokens.
///
/// Calls that would produce malformed output fail with a structural
/// [`WriteError`] and leave the writer unchanged.
pub trait JsonWriter {
    /// Opens an object.
    fn write_start_object(&mut self) -> Result<(), WriteError>;
    /// Closes the innermost open object.
    fn write_end_object(&mut self) -> Result<(), WriteError>;
    /// Opens an array.
    fn write_start_array(&mut self) -> Result<(), WriteError>;
    /// Closes the innermost open array.
    fn write_end_array(&mut self) -> Result<(), WriteError>;
    /// Writes a member name; the next write supplies its value.
    fn write_member(&mut self, name: &str) -> Result<(), WriteError>;
    /// Writes a string value.
    fn write_string(&mut self, text: &str) -> Result<(), WriteError>;
    /// Writes a number from its text form, which must satisfy the RFC 4627
    /// number grammar.
    fn write_number(&mut self, text: &str) -> Result<(), WriteError>;
    /// Writes `true` or `false`.
    fn write_boolean(&mut self, value: bool) -> Result<(), WriteError>;
    /// Writes `null`.
    fn write_null(&mut self) -> Result<(), WriteError>;

    /// Open containers at this point of the document.
    fn depth(&self) -> usize;

    /// Completed children of the innermost open scope.
    fn index(&self) -> usize;

    /// Pumps exactly one whole value from `reader` into this writer, leaving
    /// the reader positioned after it.
    fn write_from_reader(&mut self, reader: &mut dyn JsonReader) -> Result<(), ConvertError> {
        reader.move_to_content()?;
        match reader.token_class() {
            TokenClass::Eof => return Err(ReadError::UnexpectedEof.into()),
            c @ (TokenClass::EndArray | TokenClass::EndObject) => {
                return Err(ReadError::NotAValue(c).into());
            }
            _ => {}
        }
        let mut level = 0usize;
        loop {
            match reader.token_class() {
                TokenClass::Null => self.write_null()?,
                TokenClass::Boolean => self.write_boolean(reader.text() == Some("true"))?,
                TokenClass::Number => self.write_number(reader.text().unwrap_or("0"))?,
                TokenClass::String => self.write_string(reader.text().unwrap_or(""))?,
                TokenClass::Member => self.write_member(reader.text().unwrap_or(""))?,
                TokenClass::Array => {
                    self.write_start_array()?;
                    level += 1;
                }
                TokenClass::EndArray => {
                    self.write_end_array()?;
                    level -= 1;
                }
                TokenClass::Object => {
                    self.write_start_object()?;
                    level += 1;
                }
                TokenClass::EndObject => {
                    self.write_end_object()?;
                    level -= 1;
                }
                TokenClass::Bof | TokenClass::Eof => return Err(ReadError::UnexpectedEof.into()),
            }
            reader.read()?;
            if level == 0 {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WriterState {
        WriterState::new(WriterSettings::default().max_depth)
    }

    fn open(s: &mut WriterState, bracket: Bracket) -> Result<(), WriteError> {
        s.stage_container()?;
        s.commit_container(bracket);
        Ok(())
    }

    #[test]
    fn value_inside_an_object_requires_a_member_name() {
        let mut s = state();
        open(&mut s, Bracket::Object).unwrap();
        assert!(matches!(s.stage_value(true), Err(WriteError::MissingMember)));
    }

    #[test]
    fn member_name_outside_an_object_is_rejected() {
        let mut s = state();
        assert!(matches!(s.stage_member(), Err(WriteError::MemberOutsideObject)));
        open(&mut s, Bracket::Array).unwrap();
        assert!(matches!(s.stage_member(), Err(WriteError::MemberOutsideObject)));
    }

    #[test]
    fn mismatched_brackets_are_rejected() {
        let mut s = state();
        open(&mut s, Bracket::Array).unwrap();
        assert!(matches!(
            s.pop_container(Bracket::Object),
            Err(WriteError::BracketMismatch { expected: "object" })
        ));
    }

    #[test]
    fn a_second_root_value_is_rejected() {
        let mut s = state();
        open(&mut s, Bracket::Array).unwrap();
        s.pop_container(Bracket::Array).unwrap();
        assert!(matches!(s.stage_value(false), Err(WriteError::DocumentComplete)));
    }

    #[test]
    fn root_scalars_open_an_auto_array() {
        let mut s = state();
        let (slot, auto) = s.stage_value(true).unwrap();
        assert_eq!(slot, Slot::Root);
        assert!(auto);
        s.commit_value();
        // Further root scalars join the same array.
        let (slot, auto) = s.stage_value(true).unwrap();
        assert_eq!(slot, Slot::Next);
        assert!(!auto);
        s.commit_value();
        assert!(s.close().unwrap());
    }

    #[test]
    fn the_auto_array_cannot_be_closed_by_hand() {
        let mut s = state();
        s.stage_value(true).unwrap();
        s.commit_value();
        assert!(matches!(
            s.pop_container(Bracket::Array),
            Err(WriteError::BracketMismatch { expected: "array" })
        ));
    }

    #[test]
    fn close_rejects_open_brackets() {
        let mut s = state();
        open(&mut s, Bracket::Object).unwrap();
        assert!(matches!(s.close(), Err(WriteError::UnclosedBracket)));
    }

    #[test]
    fn depth_is_capped() {
        let mut s = WriterState::new(2);
        open(&mut s, Bracket::Array).unwrap();
        open(&mut s, Bracket::Array).unwrap();
        assert!(matches!(
            s.stage_container(),
            Err(WriteError::DepthExceeded(2))
        ));
    }

    #[test]
    fn writes_after_close_fail() {
        let mut s = state();
        s.stage_value(true).unwrap();
        s.commit_value();
        s.close().unwrap();
        assert!(matches!(s.stage_value(true), Err(WriteError::Closed)));
    }
}
