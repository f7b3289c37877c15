//! A streaming, token-centric JSON engine: pull readers, push writers,
//! sliceable token buffers, free-order member access, and a registry-backed
//! conversion layer between token streams and Rust values.
//!
//! Reading is lenient (comments, single-quoted and unquoted strings, hex and
//! octal numbers, trailing separators); writing is strict RFC 4627. The
//! pieces compose around one [`Token`] model: the text reader produces
//! tokens, buffers capture and replay them, writers consume them, and the
//! conversion layer maps them to values.
//!
//! ```
//! use jsonloom::{import_from_str, export_to_string};
//!
//! let values: Vec<i64> = import_from_str("[1, 2, 3,] // lenient").unwrap();
//! assert_eq!(export_to_string(&values).unwrap(), "[1,2,3]");
//! ```

#![allow(missing_docs)]

mod buffer;
mod error;
mod source;
mod token;

mod convert;
mod reader;
mod writer;

pub use buffer::{JsonBuffer, NamedBuffer};
pub use convert::{
    export_to_string, import_from_str, members_of, BindArgs, Bound, ComponentImporter,
    ConvertError, ExportContext, Exporter, ImportContext, Importer, JsonExport, JsonImport,
    JsonMemberKey, ObjectBinder,
};
pub use error::{Location, ReadError, SyntaxError, SyntaxErrorKind, WriteError};
pub use reader::{
    JsonBufferReader, JsonReader, JsonTextReader, MemberReader, MemberValue, TailMemberReader,
};
pub use source::CharSource;
pub use token::{Token, TokenClass};
pub use writer::{JsonBufferWriter, JsonTextWriter, JsonWriter, WriterSettings};
