//! [`JsonImport`]/[`JsonExport`] impls for sequences, sets, maps, and tuples.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    hash::Hash,
};

use uuid::Uuid;

use crate::{
    convert::{ConvertError, ExportContext, ImportContext, JsonExport, JsonImport},
    error::ReadError,
    reader::JsonReader,
    token::TokenClass,
    writer::JsonWriter,
};

fn import_elements<T: JsonImport>(
    context: &mut ImportContext,
    reader: &mut dyn JsonReader,
) -> Result<Vec<T>, ConvertError> {
    reader.read_token(TokenClass::Array)?;
    let mut items = Vec::new();
    loop {
        match reader.token_class() {
            TokenClass::EndArray => {
                reader.read()?;
                return Ok(items);
            }
            TokenClass::Eof => return Err(ReadError::UnexpectedEof.into()),
            _ => items.push(context.import(reader)?),
        }
    }
}

fn export_elements<'a, T: JsonExport + 'a>(
    items: impl Iterator<Item = &'a T>,
    context: &mut ExportContext,
    writer: &mut dyn JsonWriter,
) -> Result<(), ConvertError> {
    writer.write_start_array()?;
    for item in items {
        context.export(item, writer)?;
    }
    writer.write_end_array()?;
    Ok(())
}

impl<T: JsonImport> JsonImport for Vec<T> {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        import_elements(context, reader)
    }
}

impl<T: JsonExport> JsonExport for Vec<T> {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        export_elements(self.iter(), context, writer)
    }
}

impl<T: JsonImport> JsonImport for VecDeque<T> {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        Ok(import_elements(context, reader)?.into())
    }
}

impl<T: JsonExport> JsonExport for VecDeque<T> {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        export_elements(self.iter(), context, writer)
    }
}

impl<T: JsonImport> JsonImport for Box<[T]> {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        Ok(import_elements(context, reader)?.into_boxed_slice())
    }
}

impl<T: JsonExport> JsonExport for Box<[T]> {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        export_elements(self.iter(), context, writer)
    }
}

impl<T: JsonImport + Ord> JsonImport for BTreeSet<T> {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        Ok(import_elements::<T>(context, reader)?.into_iter().collect())
    }
}

impl<T: JsonExport + Ord> JsonExport for BTreeSet<T> {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        export_elements(self.iter(), context, writer)
    }
}

impl<T: JsonImport + Eq + Hash> JsonImport for HashSet<T> {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        Ok(import_elements::<T>(context, reader)?.into_iter().collect())
    }
}

impl<T: JsonExport + Eq + Hash> JsonExport for HashSet<T> {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        export_elements(self.iter(), context, writer)
    }
}

/// A type usable as an object member name.
///
/// Maps convert through this seam: text keys pass verbatim, everything else
/// parses from (and renders to) the member name.
pub trait JsonMemberKey: Sized {
    fn from_member_name(name: &str) -> Result<Self, ConvertError>;
    fn to_member_name(&self) -> String;
}

impl JsonMemberKey for String {
    fn from_member_name(name: &str) -> Result<Self, ConvertError> {
        Ok(name.to_string())
    }

    fn to_member_name(&self) -> String {
        self.clone()
    }
}

macro_rules! parsed_member_key {
    ($($t:ty => $target:literal),* $(,)?) => {$(
        impl JsonMemberKey for $t {
            fn from_member_name(name: &str) -> Result<Self, ConvertError> {
                name.parse::<$t>().map_err(|_| ConvertError::InvalidText {
                    target: $target,
                    text: name.to_string(),
                })
            }

            fn to_member_name(&self) -> String {
                self.to_string()
            }
        }
    )*};
}

parsed_member_key!(
    i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64", i128 => "i128", isize => "isize",
    u8 => "u8", u16 => "u16", u32 => "u32", u64 => "u64", u128 => "u128", usize => "usize",
    Uuid => "Uuid",
);

fn import_entries<K, V, M>(
    context: &mut ImportContext,
    reader: &mut dyn JsonReader,
    mut insert: M,
) -> Result<(), ConvertError>
where
    K: JsonMemberKey,
    V: JsonImport,
    M: FnMut(K, V),
{
    reader.read_token(TokenClass::Object)?;
    loop {
        match reader.token_class() {
            TokenClass::EndObject => {
                reader.read()?;
                return Ok(());
            }
            TokenClass::Member => {
                let name = reader.read_member()?;
                let key = K::from_member_name(&name)?;
                insert(key, context.import(reader)?);
            }
            TokenClass::Eof => return Err(ReadError::UnexpectedEof.into()),
            found => {
                return Err(ReadError::UnexpectedToken {
                    expected: TokenClass::Member,
                    found,
                }
                .into());
            }
        }
    }
}

fn export_entries<'a, K, V>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
    context: &mut ExportContext,
    writer: &mut dyn JsonWriter,
) -> Result<(), ConvertError>
where
    K: JsonMemberKey + 'a,
    V: JsonExport + 'a,
{
    writer.write_start_object()?;
    for (key, value) in entries {
        writer.write_member(&key.to_member_name())?;
        context.export(value, writer)?;
    }
    writer.write_end_object()?;
    Ok(())
}

impl<K: JsonMemberKey + Ord + 'static, V: JsonImport> JsonImport for BTreeMap<K, V> {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        let mut map = BTreeMap::new();
        import_entries(context, reader, |k, v| {
            map.insert(k, v);
        })?;
        Ok(map)
    }
}

impl<K: JsonMemberKey + Ord + 'static, V: JsonExport> JsonExport for BTreeMap<K, V> {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        export_entries(self.iter(), context, writer)
    }
}

impl<K: JsonMemberKey + Eq + Hash + 'static, V: JsonImport> JsonImport for HashMap<K, V> {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        let mut map = HashMap::new();
        import_entries(context, reader, |k, v| {
            map.insert(k, v);
        })?;
        Ok(map)
    }
}

impl<K: JsonMemberKey + Eq + Hash + 'static, V: JsonExport> JsonExport for HashMap<K, V> {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        export_entries(self.iter(), context, writer)
    }
}

/// 1-tuples pass through as the component's own shape.
impl<A: JsonImport> JsonImport for (A,) {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError> {
        Ok((context.import(reader)?,))
    }
}

impl<A: JsonExport> JsonExport for (A,) {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        context.export(&self.0, writer)
    }
}

macro_rules! tuple_convert {
    ($($name:ident),+) => {
        impl<$($name: JsonImport),+> JsonImport for ($($name,)+) {
            fn import_json(
                context: &mut ImportContext,
                reader: &mut dyn JsonReader,
            ) -> Result<Self, ConvertError> {
                reader.read_token(TokenClass::Array)?;
                let value = ($(context.import::<$name>(reader)?,)+);
                reader.read_token(TokenClass::EndArray)?;
                Ok(value)
            }
        }

        impl<$($name: JsonExport),+> JsonExport for ($($name,)+) {
            fn export_json(
                &self,
                context: &mut ExportContext,
                writer: &mut dyn JsonWriter,
            ) -> Result<(), ConvertError> {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                writer.write_start_array()?;
                $(context.export($name, writer)?;)+
                writer.write_end_array()?;
                Ok(())
            }
        }
    };
}

tuple_convert!(A, B);
tuple_convert!(A, B, C);
tuple_convert!(A, B, C, D);
tuple_convert!(A, B, C, D, E);
tuple_convert!(A, B, C, D, E, F);
tuple_convert!(A, B, C, D, E, F, G);
tuple_convert!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{export_to_string, import_from_str};

    #[test]
    fn vectors_round_trip() {
        let v: Vec<Vec<i32>> = import_from_str("[[1], [], [2, 3]]").unwrap();
        assert_eq!(v, vec![vec![1], vec![], vec![2, 3]]);
        assert_eq!(export_to_string(&v).unwrap(), "[[1],[],[2,3]]");
    }

    #[test]
    fn deques_and_boxed_slices() {
        let d: VecDeque<u8> = import_from_str("[1, 2]").unwrap();
        assert_eq!(d, VecDeque::from([1, 2]));
        let b: Box<[String]> = import_from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(&*b, &["a".to_string(), "b".to_string()]);
        assert_eq!(export_to_string(&b).unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn sets_deduplicate() {
        let s: BTreeSet<i32> = import_from_str("[3, 1, 3, 2]").unwrap();
        assert_eq!(s.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        let h: HashSet<String> = import_from_str(r#"["a", "a"]"#).unwrap();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn maps_with_text_keys() {
        let m: BTreeMap<String, i32> = import_from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m["a"], 1);
        assert_eq!(export_to_string(&m).unwrap(), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn maps_with_numeric_keys() {
        let m: BTreeMap<u32, String> = import_from_str(r#"{"2": "two", "10": "ten"}"#).unwrap();
        assert_eq!(m[&2], "two");
        assert_eq!(m[&10], "ten");
        assert_eq!(export_to_string(&m).unwrap(), r#"{"2":"two","10":"ten"}"#);
    }

    #[test]
    fn bad_member_keys_are_reported() {
        assert!(matches!(
            import_from_str::<BTreeMap<u32, i32>>(r#"{"x": 1}"#),
            Err(ConvertError::InvalidText { target: "u32", .. })
        ));
    }

    #[test]
    fn tuples_are_positional_arrays() {
        let t: (i32, String, bool) = import_from_str(r#"[7, "x", true]"#).unwrap();
        assert_eq!(t, (7, "x".to_string(), true));
        assert_eq!(export_to_string(&t).unwrap(), r#"[7,"x",true]"#);
    }

    #[test]
    fn one_tuples_are_unwrapped() {
        let t: (i32,) = import_from_str("5").unwrap();
        assert_eq!(t, (5,));
        assert_eq!(export_to_string(&t).unwrap(), "[5]");
    }

    #[test]
    fn short_tuple_arrays_fail() {
        assert!(import_from_str::<(i32, i32)>("[1]").is_err());
        assert!(import_from_str::<(i32, i32)>("[1, 2, 3]").is_err());
    }
}
