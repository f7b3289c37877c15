#![allow(missing_docs)]

use jsonloom::{
    ImportContext, JsonReader, JsonTextReader, JsonTextWriter, JsonWriter, MemberReader,
    TokenClass,
};

#[test]
fn members_come_back_in_request_order() {
    let mut base = JsonTextReader::from_str("{ y: 456, x: 123, z: 789 }");
    let mut members = MemberReader::new(&mut base).unwrap();
    for (name, expected) in [("x", "123"), ("y", "456"), ("z", "789")] {
        assert_eq!(
            &*members.read_member(name).unwrap().read_number().unwrap(),
            expected
        );
    }
    drop(members);
    assert_eq!(base.token_class(), TokenClass::EndObject);
}

#[test]
fn typed_imports_compose_with_free_order() {
    let mut base = JsonTextReader::from_str(
        r#"{"items": [3, 4], "id": "a1", "flags": {"hot": true}}"#,
    );
    let mut members = MemberReader::new(&mut base).unwrap();
    let mut ctx = ImportContext::new();

    let id: String = ctx.import(&mut members.read_member("id").unwrap()).unwrap();
    let items: Vec<i32> = ctx.import(&mut members.read_member("items").unwrap()).unwrap();
    assert_eq!(id, "a1");
    assert_eq!(items, vec![3, 4]);

    // Whatever was never requested is still there as an object of its own.
    let mut tail = members.tail_reader();
    let mut writer = JsonTextWriter::new(Vec::new());
    writer.write_from_reader(&mut tail).unwrap();
    writer.close().unwrap();
    assert_eq!(
        String::from_utf8(writer.into_inner()).unwrap(),
        r#"{"flags":{"hot":true}}"#
    );
}

#[test]
fn the_base_reader_continues_past_the_object() {
    let mut base = JsonTextReader::from_str(r#"[{"a": 1, "b": 2}, "after"]"#);
    base.read().unwrap(); // outer array
    {
        let mut members = MemberReader::new(&mut base).unwrap();
        assert_eq!(&*members.read_member("b").unwrap().read_number().unwrap(), "2");
        let mut tail = members.tail_reader();
        while tail.read().unwrap() {}
    }
    // The tail left the base on EndObject; the outer array goes on.
    base.read().unwrap();
    assert_eq!(&*base.read_string().unwrap(), "after");
}
