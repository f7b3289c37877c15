//! Rendering a token stream as JSON text.

use std::io;

use crate::{
    error::WriteError,
    token::is_number_text,
    writer::{Bracket, JsonWriter, Slot, WriterSettings, WriterState},
};

/// A writer that renders JSON text into any [`io::Write`] sink.
///
/// Output is strict RFC 4627 regardless of the leniency accepted on the read
/// side: double-quoted strings only, no comments, no trailing separators.
/// A scalar written at the root is wrapped in a one-element array so the
/// document stays a valid JSON text.
///
/// # Examples
///
/// ```
/// use jsonloom::{JsonTextWriter, JsonWriter};
///
/// let mut writer = JsonTextWriter::new(Vec::new());
/// writer.write_start_object().unwrap();
/// writer.write_member("ok").unwrap();
/// writer.write_boolean(true).unwrap();
/// writer.write_end_object().unwrap();
/// writer.close().unwrap();
/// assert_eq!(writer.into_inner(), b"{\"ok\":true}");
/// ```
pub struct JsonTextWriter<W: io::Write> {
    out: W,
    state: WriterState,
    settings: WriterSettings,
}

impl<W: io::Write> JsonTextWriter<W> {
    /// A compact writer with default settings.
    pub fn new(out: W) -> Self {
        Self::with_settings(out, WriterSettings::default())
    }

    /// A pretty-printing writer.
    pub fn pretty(out: W) -> Self {
        Self::with_settings(
            out,
            WriterSettings {
                pretty: true,
                ..WriterSettings::default()
            },
        )
    }

    pub fn with_settings(out: W, settings: WriterSettings) -> Self {
        Self {
            out,
            state: WriterState::new(settings.max_depth),
            settings,
        }
    }

    /// Finishes the document, rendering the auto array's closing bracket if
    /// one is open. Idempotent.
    pub fn close(&mut self) -> Result<(), WriteError> {
        if self.state.close()? {
            self.out.write_all(b"]")?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// The underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn newline_indent(&mut self) -> io::Result<()> {
        self.out.write_all(b"\n")?;
        let spaces = self.state.depth() * self.settings.indent;
        // Indentation is written in chunks to keep allocation out of the
        // per-token path.
        const PAD: &[u8] = b"                                ";
        let mut left = spaces;
        while left > 0 {
            let n = left.min(PAD.len());
            self.out.write_all(&PAD[..n])?;
            left -= n;
        }
        Ok(())
    }

    fn lead_in(&mut self, slot: Slot) -> io::Result<()> {
        match slot {
            Slot::Root | Slot::MemberValue => Ok(()),
            Slot::First => {
                if self.settings.pretty {
                    self.newline_indent()?;
                }
                Ok(())
            }
            Slot::Next => {
                self.out.write_all(b",")?;
                if self.settings.pretty {
                    self.newline_indent()?;
                }
                Ok(())
            }
        }
    }

    fn write_scalar(&mut self, rendered: &str) -> Result<(), WriteError> {
        let (slot, auto) = self.state.stage_value(true)?;
        if auto {
            self.out.write_all(b"[")?;
            self.lead_in(Slot::First)?;
        } else {
            self.lead_in(slot)?;
        }
        self.out.write_all(rendered.as_bytes())?;
        self.state.commit_value();
        Ok(())
    }

    fn write_quoted(&mut self, text: &str) -> io::Result<()> {
        let mut rendered = String::with_capacity(text.len() + 2);
        rendered.push('"');
        for ch in text.chars() {
            match ch {
                '"' => rendered.push_str("\\\""),
                '\\' => rendered.push_str("\\\\"),
                '\u{0008}' => rendered.push_str("\\b"),
                '\u{000C}' => rendered.push_str("\\f"),
                '\n' => rendered.push_str("\\n"),
                '\r' => rendered.push_str("\\r"),
                '\t' => rendered.push_str("\\t"),
                // Raw line separators break eval-style consumers.
                c if (c as u32) < 0x20 || c == '\u{2028}' || c == '\u{2029}' => {
                    let code = c as u32;
                    rendered.push_str("\\u");
                    for shift in [12u32, 8, 4, 0] {
                        let digit = (code >> shift) & 0xF;
                        rendered.push(char::from_digit(digit, 16).unwrap_or('0'));
                    }
                }
                c => rendered.push(c),
            }
        }
        rendered.push('"');
        self.out.write_all(rendered.as_bytes())
    }

    fn open(&mut self, bracket: Bracket) -> Result<(), WriteError> {
        let slot = self.state.stage_container()?;
        self.lead_in(slot)?;
        self.out.write_all(match bracket {
            Bracket::Array => b"[",
            Bracket::Object => b"{",
        })?;
        self.state.commit_container(bracket);
        Ok(())
    }

    fn shut(&mut self, bracket: Bracket) -> Result<(), WriteError> {
        let children = self.state.pop_container(bracket)?;
        if self.settings.pretty && children > 0 {
            self.newline_indent()?;
        }
        self.out.write_all(match bracket {
            Bracket::Array => b"]",
            Bracket::Object => b"}",
        })?;
        Ok(())
    }
}

impl<W: io::Write> JsonWriter for JsonTextWriter<W> {
    fn write_start_object(&mut self) -> Result<(), WriteError> {
        self.open(Bracket::Object)
    }

    fn write_end_object(&mut self) -> Result<(), WriteError> {
        self.shut(Bracket::Object)
    }

    fn write_start_array(&mut self) -> Result<(), WriteError> {
        self.open(Bracket::Array)
    }

    fn write_end_array(&mut self) -> Result<(), WriteError> {
        self.shut(Bracket::Array)
    }

    fn write_member(&mut self, name: &str) -> Result<(), WriteError> {
        let slot = self.state.stage_member()?;
        self.lead_in(slot)?;
        self.write_quoted(name)?;
        self.out.write_all(b":")?;
        if self.settings.pretty {
            self.out.write_all(b" ")?;
        }
        self.state.commit_member();
        Ok(())
    }

    fn write_string(&mut self, text: &str) -> Result<(), WriteError> {
        let (slot, auto) = self.state.stage_value(true)?;
        if auto {
            self.out.write_all(b"[")?;
            self.lead_in(Slot::First)?;
        } else {
            self.lead_in(slot)?;
        }
        self.write_quoted(text)?;
        self.state.commit_value();
        Ok(())
    }

    fn write_number(&mut self, text: &str) -> Result<(), WriteError> {
        if !is_number_text(text) {
            return Err(WriteError::InvalidNumber(text.to_string()));
        }
        self.write_scalar(text)
    }

    fn write_boolean(&mut self, value: bool) -> Result<(), WriteError> {
        self.write_scalar(if value { "true" } else { "false" })
    }

    fn write_null(&mut self) -> Result<(), WriteError> {
        self.write_scalar("null")
    }

    fn depth(&self) -> usize {
        self.state.depth()
    }

    fn index(&self) -> usize {
        self.state.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::JsonTextReader;

    fn rendered(build: impl FnOnce(&mut JsonTextWriter<Vec<u8>>) -> Result<(), WriteError>) -> String {
        let mut writer = JsonTextWriter::new(Vec::new());
        build(&mut writer).unwrap();
        writer.close().unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn compact_object() {
        let text = rendered(|w| {
            w.write_start_object()?;
            w.write_member("a")?;
            w.write_number("1")?;
            w.write_member("b")?;
            w.write_null()?;
            w.write_end_object()
        });
        assert_eq!(text, "{\"a\":1,\"b\":null}");
    }

    #[test]
    fn root_scalar_is_wrapped_in_an_array() {
        assert_eq!(rendered(|w| w.write_number("42")), "[42]");
        assert_eq!(rendered(|w| w.write_string("x")), "[\"x\"]");
        let two = rendered(|w| {
            w.write_boolean(true)?;
            w.write_boolean(false)
        });
        assert_eq!(two, "[true,false]");
    }

    #[test]
    fn root_containers_are_not_wrapped() {
        let text = rendered(|w| {
            w.write_start_array()?;
            w.write_end_array()
        });
        assert_eq!(text, "[]");
    }

    #[test]
    fn string_escaping() {
        let text = rendered(|w| w.write_string("a\"b\\c\nd\u{0001}e\u{2028}"));
        assert_eq!(text, "[\"a\\\"b\\\\c\\nd\\u0001e\\u2028\"]");
    }

    #[test]
    fn member_names_are_escaped() {
        let text = rendered(|w| {
            w.write_start_object()?;
            w.write_member("a\"b")?;
            w.write_number("1")?;
            w.write_end_object()
        });
        assert_eq!(text, "{\"a\\\"b\":1}");
    }

    #[test]
    fn invalid_number_text_is_rejected() {
        let mut writer = JsonTextWriter::new(Vec::new());
        assert!(matches!(
            writer.write_number("0x10"),
            Err(WriteError::InvalidNumber(_))
        ));
        // The rejection leaves the writer usable.
        writer.write_number("16").unwrap();
    }

    #[test]
    fn pretty_printing() {
        let mut writer = JsonTextWriter::pretty(Vec::new());
        writer.write_start_object().unwrap();
        writer.write_member("a").unwrap();
        writer.write_number("1").unwrap();
        writer.write_member("b").unwrap();
        writer.write_start_array().unwrap();
        writer.write_number("1").unwrap();
        writer.write_number("2").unwrap();
        writer.write_end_array().unwrap();
        writer.write_end_object().unwrap();
        writer.close().unwrap();
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "{\n    \"a\": 1,\n    \"b\": [\n        1,\n        2\n    ]\n}"
        );
    }

    #[test]
    fn pretty_empty_containers_stay_on_one_line() {
        let mut writer = JsonTextWriter::pretty(Vec::new());
        writer.write_start_array().unwrap();
        writer.write_start_object().unwrap();
        writer.write_end_object().unwrap();
        writer.write_end_array().unwrap();
        writer.close().unwrap();
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "[\n    {}\n]");
    }

    #[test]
    fn pump_from_a_reader_normalizes_lenient_input() {
        let mut reader = JsonTextReader::from_str("{a: 'x'; b => [1, 2,], /* c */ c: 0x10}");
        let mut writer = JsonTextWriter::new(Vec::new());
        writer.write_from_reader(&mut reader).unwrap();
        writer.close().unwrap();
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "{\"a\":\"x\",\"b\":[1,2],\"c\":16}"
        );
    }

    #[test]
    fn close_is_idempotent() {
        let mut writer = JsonTextWriter::new(Vec::new());
        writer.write_number("1").unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert_eq!(writer.into_inner(), b"[1]");
    }
}
