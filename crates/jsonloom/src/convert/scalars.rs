//! [`JsonImport`]/[`JsonExport`] impls for scalar-shaped types.
//!
//! Imports are lenient the way the reader is: numbers accept numeric text
//! carried in a String token and booleans as 0/1, booleans accept "true"
//! and "false" and treat any non-zero number as true. Exports are strict.

use std::{cell::RefCell, collections::HashSet, rc::Rc, sync::Arc};

use chrono::{DateTime, NaiveDateTime, Utc};
use url::Url;
use uuid::Uuid;

use crate::{
    buffer::JsonBuffer,
    convert::{ConvertError, ExportContext, ImportContext, JsonExport, JsonImport},
    reader::JsonReader,
    token::TokenClass,
    writer::JsonWriter,
};

/// Pulls numeric text out of the current scalar: Number and String tokens
/// verbatim, Boolean as 0/1.
fn read_numeric_text(reader: &mut dyn JsonReader) -> Result<String, ConvertError> {
    reader.move_to_content()?;
    match reader.token_class() {
        TokenClass::Number | TokenClass::String => {
            let text = reader.text().unwrap_or("").to_string();
            reader.read()?;
            Ok(text)
        }
        TokenClass::Boolean => Ok(if reader.read_boolean()? { "1" } else { "0" }.to_string()),
        found => Err(ConvertError::UnexpectedShape { expected: "a number", found }),
    }
}

macro_rules! integer_convert {
    ($($t:ty),* $(,)?) => {$(
        impl JsonImport for $t {
            fn import_json(
                _context: &mut ImportContext,
                reader: &mut dyn JsonReader,
            ) -> Result<Self, ConvertError> {
                let text = read_numeric_text(reader)?;
                if let Ok(value) = text.parse::<$t>() {
                    return Ok(value);
                }
                // Exponent or fraction forms ("1e3", "2.0") go through f64.
                let wide = text.parse::<f64>().map_err(|_| ConvertError::NumberShape {
                    target: stringify!($t),
                    text: text.clone(),
                })?;
                // MAX as f64 rounds up past MAX for the wide types (2^63 for
                // i64), so the upper bound is exclusive at MAX + 1; MIN is a
                // power of two and always exact.
                if wide.fract() != 0.0
                    || wide < <$t>::MIN as f64
                    || wide >= (<$t>::MAX as f64) + 1.0
                {
                    return Err(ConvertError::NumberShape {
                        target: stringify!($t),
                        text,
                    });
                }
                Ok(wide as $t)
            }
        }

        impl JsonExport for $t {
            fn export_json(
                &self,
                _context: &mut ExportContext,
                writer: &mut dyn JsonWriter,
            ) -> Result<(), ConvertError> {
                Ok(writer.write_number(&self.to_string())?)
            }
        }
    )*};
}

integer_convert!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! float_convert {
    ($($t:ty),* $(,)?) => {$(
        impl JsonImport for $t {
            fn import_json(
                _context: &mut ImportContext,
                reader: &mut dyn JsonReader,
            ) -> Result<Self, ConvertError> {
                let text = read_numeric_text(reader)?;
                text.parse::<$t>().map_err(|_| ConvertError::NumberShape {
                    target: stringify!($t),
                    text,
                })
            }
        }

        impl JsonExport for $t {
            fn export_json(
                &self,
                _context: &mut ExportContext,
                writer: &mut dyn JsonWriter,
            ) -> Result<(), ConvertError> {
                if !self.is_finite() {
                    return Err(ConvertError::NumberShape {
                        target: stringify!($t),
                        text: self.to_string(),
                    });
                }
                let mut text = self.to_string();
                // "1" rather than "1.0" would round-trip as an integer; JSON
                // has one number shape, so plain text is fine either way.
                if !text.contains(['.', 'e', 'E']) {
                    text.push_str(".0");
                }
                Ok(writer.write_number(&text)?)
            }
        }
    )*};
}

float_convert!(f32, f64);

impl JsonImport for bool {
    fn import_json(
        _context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        reader.move_to_content()?;
        match reader.token_class() {
            TokenClass::Boolean => Ok(reader.read_boolean()?),
            TokenClass::String => {
                let text = reader.read_string()?;
                match &*text {
                    "true" => Ok(true),
                    "false" => Ok(false),
                    _ => Err(ConvertError::InvalidText {
                        target: "bool",
                        text: text.to_string(),
                    }),
                }
            }
            TokenClass::Number => {
                let text = reader.read_number()?;
                Ok(text.parse::<f64>().is_ok_and(|n| n != 0.0))
            }
            found => Err(ConvertError::UnexpectedShape { expected: "a boolean", found }),
        }
    }
}

impl JsonExport for bool {
    fn export_json(
        &self,
        _context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        Ok(writer.write_boolean(*self)?)
    }
}

impl JsonImport for String {
    fn import_json(
        _context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        reader.move_to_content()?;
        match reader.token_class() {
            c if c.is_scalar() => {
                let text = reader.text().unwrap_or("").to_string();
                reader.read()?;
                Ok(text)
            }
            found => Err(ConvertError::UnexpectedShape { expected: "a scalar", found }),
        }
    }
}

impl JsonExport for String {
    fn export_json(
        &self,
        _context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        Ok(writer.write_string(self)?)
    }
}

impl JsonImport for char {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        let text: String = context.import(reader)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(ch),
            _ => Err(ConvertError::InvalidText { target: "char", text }),
        }
    }
}

impl JsonExport for char {
    fn export_json(
        &self,
        _context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        Ok(writer.write_string(&self.to_string())?)
    }
}

macro_rules! text_convert {
    ($t:ty, $target:literal, $parse:expr, $render:expr) => {
        impl JsonImport for $t {
            fn import_json(
                context: &mut ImportContext,
                reader: &mut dyn JsonReader,
            ) -> Result<Self, ConvertError> {
                let text: String = context.import(reader)?;
                #[allow(clippy::redundant_closure_call)]
                ($parse)(&text).map_err(|_| ConvertError::InvalidText {
                    target: $target,
                    text,
                })
            }
        }

        impl JsonExport for $t {
            fn export_json(
                &self,
                _context: &mut ExportContext,
                writer: &mut dyn JsonWriter,
            ) -> Result<(), ConvertError> {
                #[allow(clippy::redundant_closure_call)]
                Ok(writer.write_string(&($render)(self))?)
            }
        }
    };
}

text_convert!(
    DateTime<Utc>,
    "DateTime<Utc>",
    |text: &str| DateTime::parse_from_rfc3339(text).map(|dt| dt.with_timezone(&Utc)),
    |value: &DateTime<Utc>| value.to_rfc3339()
);

text_convert!(
    NaiveDateTime,
    "NaiveDateTime",
    |text: &str| text.parse::<NaiveDateTime>(),
    |value: &NaiveDateTime| value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
);

text_convert!(
    Uuid,
    "Uuid",
    |text: &str| text.parse::<Uuid>(),
    |value: &Uuid| value.to_string()
);

text_convert!(
    Url,
    "Url",
    |text: &str| text.parse::<Url>(),
    |value: &Url| value.as_str().to_string()
);

/// The nullable rule: `Null` (or end of input) is `None`, anything else is
/// the inner type's own shape.
impl<T: JsonImport> JsonImport for Option<T> {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        reader.move_to_content()?;
        match reader.token_class() {
            TokenClass::Null => {
                reader.read()?;
                Ok(None)
            }
            TokenClass::Eof => Ok(None),
            _ => Ok(Some(context.import(reader)?)),
        }
    }
}

impl<T: JsonExport> JsonExport for Option<T> {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        match self {
            // Logical null; no converter lookup for the absent value.
            None => Ok(writer.write_null()?),
            Some(value) => context.export(value, writer),
        }
    }
}

impl<T: JsonImport> JsonImport for Box<T> {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        Ok(Box::new(context.import(reader)?))
    }
}

impl<T: JsonExport> JsonExport for Box<T> {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        context.export(&**self, writer)
    }
}

/// Pointer identities currently being exported, for cycle detection.
#[derive(Default)]
struct ExportTracker {
    in_flight: HashSet<usize>,
}

macro_rules! shared_convert {
    ($t:ident, $as_ptr:path) => {
        impl<T: JsonImport> JsonImport for $t<T> {
            fn import_json(
                context: &mut ImportContext,
                reader: &mut dyn JsonReader,
            ) -> Result<Self, ConvertError> {
                Ok($t::new(context.import(reader)?))
            }
        }

        impl<T: JsonExport> JsonExport for $t<T> {
            fn export_json(
                &self,
                context: &mut ExportContext,
                writer: &mut dyn JsonWriter,
            ) -> Result<(), ConvertError> {
                let identity = $as_ptr(self) as usize;
                let tracker = context.item_mut_or_default::<ExportTracker>();
                if !tracker.in_flight.insert(identity) {
                    return Err(ConvertError::CircularReference);
                }
                let result = context.export(&**self, writer);
                context
                    .item_mut_or_default::<ExportTracker>()
                    .in_flight
                    .remove(&identity);
                result
            }
        }
    };
}

shared_convert!(Rc, Rc::as_ptr);
shared_convert!(Arc, Arc::as_ptr);

impl<T: JsonImport> JsonImport for RefCell<T> {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        Ok(RefCell::new(context.import(reader)?))
    }
}

impl<T: JsonExport> JsonExport for RefCell<T> {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        // A mutable borrow held here means the value is being exported
        // through itself.
        let value = self.try_borrow().map_err(|_| ConvertError::CircularReference)?;
        context.export(&*value, writer)
    }
}

impl JsonImport for JsonBuffer {
    fn import_json(
        _context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        Ok(JsonBuffer::from_reader(reader)?)
    }
}

impl JsonExport for JsonBuffer {
    fn export_json(
        &self,
        _context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        self.write_to(writer)
    }
}
