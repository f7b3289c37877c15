#![allow(missing_docs)]

use std::collections::BTreeMap;

use jsonloom::{
    export_to_string, import_from_str, JsonBuffer, JsonTextWriter, JsonWriter, WriteError,
};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use rstest::rstest;

/// An arbitrary JSON document, depth-bounded so shrinking stays fast.
#[derive(Debug, Clone)]
enum Doc {
    Null,
    Bool(bool),
    Num(i64),
    Str(String),
    Arr(Vec<Doc>),
    Obj(Vec<(String, Doc)>),
}

fn arbitrary_doc(g: &mut Gen, depth: usize) -> Doc {
    let variants = if depth == 0 { 4 } else { 6 };
    match u8::arbitrary(g) % variants {
        0 => Doc::Null,
        1 => Doc::Bool(bool::arbitrary(g)),
        2 => Doc::Num(i64::arbitrary(g)),
        3 => Doc::Str(String::arbitrary(g)),
        4 => Doc::Arr(
            (0..usize::arbitrary(g) % 4)
                .map(|_| arbitrary_doc(g, depth - 1))
                .collect(),
        ),
        _ => Doc::Obj(
            (0..usize::arbitrary(g) % 4)
                .map(|_| (String::arbitrary(g), arbitrary_doc(g, depth - 1)))
                .collect(),
        ),
    }
}

impl Arbitrary for Doc {
    fn arbitrary(g: &mut Gen) -> Self {
        arbitrary_doc(g, 3)
    }
}

fn write_doc(doc: &Doc, writer: &mut dyn JsonWriter) -> Result<(), WriteError> {
    match doc {
        Doc::Null => writer.write_null(),
        Doc::Bool(b) => writer.write_boolean(*b),
        Doc::Num(n) => writer.write_number(&n.to_string()),
        Doc::Str(s) => writer.write_string(s),
        Doc::Arr(items) => {
            writer.write_start_array()?;
            for item in items {
                write_doc(item, writer)?;
            }
            writer.write_end_array()
        }
        Doc::Obj(members) => {
            writer.write_start_object()?;
            for (name, value) in members {
                writer.write_member(name)?;
                write_doc(value, writer)?;
            }
            writer.write_end_object()
        }
    }
}

fn render(doc: &Doc, pretty: bool) -> String {
    let mut writer = if pretty {
        JsonTextWriter::pretty(Vec::new())
    } else {
        JsonTextWriter::new(Vec::new())
    };
    write_doc(doc, &mut writer).unwrap();
    writer.close().unwrap();
    String::from_utf8(writer.into_inner()).unwrap()
}

#[quickcheck]
fn text_to_buffer_to_text_round_trips(doc: Doc) -> bool {
    let text = render(&doc, false);
    let buffer = JsonBuffer::parse(&text).unwrap();
    let again = JsonBuffer::parse(&buffer.to_string()).unwrap();
    buffer == again
}

#[quickcheck]
fn pretty_and_compact_renderings_parse_alike(doc: Doc) -> bool {
    let compact = JsonBuffer::parse(&render(&doc, false)).unwrap();
    let pretty = JsonBuffer::parse(&render(&doc, true)).unwrap();
    compact == pretty
}

#[rstest]
#[case::object(r#"{"a":1,"b":[true,null],"c":"x"}"#)]
#[case::nested(r#"[[[]],{"m":{"n":[0]}}]"#)]
#[case::escapes("[\"line\\nbreak \\u0001\"]")]
#[case::empty_object("{}")]
fn fixture_texts_round_trip(#[case] text: &str) {
    let buffer = JsonBuffer::parse(text).unwrap();
    assert_eq!(buffer.to_string(), text);
}

#[test]
fn typed_round_trip_at_depth() {
    type Catalog = BTreeMap<String, Vec<Option<(u32, String)>>>;
    let text = r#"{"a":[[1,"one"],null],"b":[]}"#;
    let catalog: Catalog = import_from_str(text).unwrap();
    assert_eq!(catalog["a"][0], Some((1, "one".to_string())));
    assert_eq!(catalog["a"][1], None);
    assert_eq!(export_to_string(&catalog).unwrap(), text);
}

#[test]
fn lenient_text_normalizes_on_the_way_out() {
    let buffer = JsonBuffer::parse("{a: 0x1F, 'b': [1, 2,], c: yes /* word */}").unwrap();
    assert_eq!(buffer.to_string(), r#"{"a":31,"b":[1,2],"c":"yes"}"#);
}
