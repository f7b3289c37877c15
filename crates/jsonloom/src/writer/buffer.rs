//! Capturing written tokens into a [`JsonBuffer`].

use std::rc::Rc;

use crate::{
    buffer::{BufferStorage, JsonBuffer},
    error::WriteError,
    token::Token,
    writer::{Bracket, JsonWriter, WriterSettings, WriterState},
};

/// A writer whose output is a token buffer instead of text.
///
/// The same legality rules apply as for text: a scalar written at the root
/// is wrapped in a one-element array, so the captured buffer is always a
/// complete value.
///
/// # Examples
///
/// ```
/// use jsonloom::{JsonBufferWriter, JsonWriter};
///
/// let mut writer = JsonBufferWriter::new();
/// writer.write_start_array().unwrap();
/// writer.write_number("1").unwrap();
/// writer.write_end_array().unwrap();
/// assert_eq!(writer.buffer().unwrap().to_string(), "[1]");
/// ```
#[derive(Debug)]
pub struct JsonBufferWriter {
    storage: Rc<BufferStorage>,
    state: WriterState,
}

impl Default for JsonBufferWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonBufferWriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: Rc::new(BufferStorage::new()),
            state: WriterState::new(WriterSettings::default().max_depth),
        }
    }

    /// Finishes the document and returns the captured buffer. May be called
    /// more than once; later calls return the same buffer.
    pub fn buffer(&mut self) -> Result<JsonBuffer, WriteError> {
        if self.state.close()? {
            self.storage.push(Token::end_array());
        }
        Ok(JsonBuffer::over(Rc::clone(&self.storage), 0, self.storage.len()))
    }

    fn push_scalar(&mut self, token: Token) -> Result<(), WriteError> {
        let (_, auto) = self.state.stage_value(true)?;
        if auto {
            self.storage.push(Token::array());
        }
        self.storage.push(token);
        self.state.commit_value();
        Ok(())
    }
}

impl JsonWriter for JsonBufferWriter {
    fn write_start_object(&mut self) -> Result<(), WriteError> {
        self.state.stage_container()?;
        self.storage.push(Token::object());
        self.state.commit_container(Bracket::Object);
        Ok(())
    }

    fn write_end_object(&mut self) -> Result<(), WriteError> {
        self.state.pop_container(Bracket::Object)?;
        self.storage.push(Token::end_object());
        Ok(())
    }

    fn write_start_array(&mut self) -> Result<(), WriteError> {
        self.state.stage_container()?;
        self.storage.push(Token::array());
        self.state.commit_container(Bracket::Array);
        Ok(())
    }

    fn write_end_array(&mut self) -> Result<(), WriteError> {
        self.state.pop_container(Bracket::Array)?;
        self.storage.push(Token::end_array());
        Ok(())
    }

    fn write_member(&mut self, name: &str) -> Result<(), WriteError> {
        self.state.stage_member()?;
        self.storage.push(Token::member(name));
        self.state.commit_member();
        Ok(())
    }

    fn write_string(&mut self, text: &str) -> Result<(), WriteError> {
        self.push_scalar(Token::string(text))
    }

    fn write_number(&mut self, text: &str) -> Result<(), WriteError> {
        if !crate::token::is_number_text(text) {
            return Err(WriteError::InvalidNumber(text.to_string()));
        }
        self.push_scalar(Token::number(text))
    }

    fn write_boolean(&mut self, value: bool) -> Result<(), WriteError> {
        self.push_scalar(Token::boolean(value))
    }

    fn write_null(&mut self) -> Result<(), WriteError> {
        self.push_scalar(Token::null())
    }

    fn depth(&self) -> usize {
        self.state.depth()
    }

    fn index(&self) -> usize {
        self.state.index()
    }
}
