//! Binding JSON objects to constructors.
//!
//! [`ObjectBinder`] holds an explicit table of constructors for a type.
//! Binding matches each constructor's parameter names against an object's
//! members, most specific constructor first; members left over become the
//! *tail*, available for setter application or re-export. This replaces
//! reflective constructor discovery with a table the application declares.

use std::{any, rc::Rc};

use crate::{
    buffer::{snapshot_value, BufferStorage, JsonBuffer, NamedBuffer},
    convert::{ConvertError, ImportContext, JsonImport},
    error::ReadError,
    reader::{JsonBufferReader, JsonReader},
    token::TokenClass,
    writer::{JsonBufferWriter, JsonWriter},
};

/// Materializes the object the reader is positioned on into named buffers
/// over one shared token storage. The reader is left after the object.
pub fn members_of(reader: &mut dyn JsonReader) -> Result<Vec<NamedBuffer>, ConvertError> {
    reader.move_to_content()?;
    if reader.token_class() != TokenClass::Object {
        return Err(ReadError::NotAnObject.into());
    }
    reader.read()?;
    let storage = Rc::new(BufferStorage::new());
    let mut members = Vec::new();
    loop {
        match reader.token_class() {
            TokenClass::EndObject => {
                reader.read()?;
                return Ok(members);
            }
            TokenClass::Member => {
                let name = reader.read_member()?;
                let value = snapshot_value(reader, &storage)?;
                members.push(NamedBuffer::new(name, value));
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

/// A tuple of constructor arguments importable from bound members.
///
/// Implemented for `()` and tuples up to 8 elements whose components are
/// [`JsonImport`]. `values` arrives in parameter order, one member per
/// parameter.
pub trait BindArgs: Sized {
    const ARITY: usize;

    fn import_args(
        context: &mut ImportContext,
        values: &[&NamedBuffer],
    ) -> Result<Self, ConvertError>;
}

impl BindArgs for () {
    const ARITY: usize = 0;

    fn import_args(_: &mut ImportContext, _: &[&NamedBuffer]) -> Result<Self, ConvertError> {
        Ok(())
    }
}

macro_rules! bind_args {
    ($count:expr => $($name:ident $idx:tt),+) => {
        impl<$($name: JsonImport),+> BindArgs for ($($name,)+) {
            const ARITY: usize = $count;

            fn import_args(
                context: &mut ImportContext,
                values: &[&NamedBuffer],
            ) -> Result<Self, ConvertError> {
                Ok(($(context.import::<$name>(&mut values[$idx].buffer().read())?,)+))
            }
        }
    };
}

bind_args!(1 => A 0);
bind_args!(2 => A 0, B 1);
bind_args!(3 => A 0, B 1, C 2);
bind_args!(4 => A 0, B 1, C 2, D 3);
bind_args!(5 => A 0, B 1, C 2, D 3, E 4);
bind_args!(6 => A 0, B 1, C 2, D 3, E 4, F 5);
bind_args!(7 => A 0, B 1, C 2, D 3, E 4, F 5, G 6);
bind_args!(8 => A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

type BuildFn<T> =
    Box<dyn Fn(&mut ImportContext, &[&NamedBuffer]) -> Result<T, ConvertError> + Send + Sync>;

struct Constructor<T> {
    params: Vec<&'static str>,
    build: BuildFn<T>,
}

/// The result of binding an object: the constructed value plus the members
/// no constructor parameter claimed, in wire order.
#[derive(Debug)]
pub struct Bound<T> {
    pub value: T,
    pub tail: Vec<NamedBuffer>,
}

impl<T> Bound<T> {
    /// The tail re-assembled as an object buffer.
    pub fn tail_buffer(&self) -> Result<JsonBuffer, ConvertError> {
        let mut writer = JsonBufferWriter::new();
        writer.write_start_object()?;
        for member in &self.tail {
            writer.write_member(member.name())?;
            writer.write_from_reader(&mut member.buffer().read())?;
        }
        writer.write_end_object()?;
        Ok(writer.buffer()?)
    }

    /// Replays the tail as an object token stream.
    pub fn tail_reader(&self) -> Result<JsonBufferReader, ConvertError> {
        Ok(self.tail_buffer()?.read())
    }
}

/// An explicit constructor table for `T`.
///
/// # Examples
///
/// ```
/// use jsonloom::{ImportContext, JsonTextReader, ObjectBinder};
///
/// struct Point { x: f64, y: f64 }
///
/// let binder = ObjectBinder::new()
///     .constructor(&["x", "y"], |(x, y): (f64, f64)| Point { x, y });
/// let mut ctx = ImportContext::new();
/// let members = jsonloom::members_of(&mut JsonTextReader::from_str("{y: 2, x: 1}")).unwrap();
/// let bound = binder.bind(&mut ctx, &members).unwrap();
/// assert_eq!((bound.value.x, bound.value.y), (1.0, 2.0));
/// assert!(bound.tail.is_empty());
/// ```
pub struct ObjectBinder<T> {
    constructors: Vec<Constructor<T>>,
}

impl<T: 'static> Default for ObjectBinder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ObjectBinder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { constructors: Vec::new() }
    }

    /// Registers a constructor taking the members named in `params`, in
    /// order. A zero-parameter constructor acts as the fallback: it always
    /// binds, leaving every member in the tail.
    ///
    /// # Panics
    ///
    /// Panics when `params` does not have one name per argument.
    #[must_use]
    pub fn constructor<Args, F>(mut self, params: &[&'static str], f: F) -> Self
    where
        Args: BindArgs,
        F: Fn(Args) -> T + Send + Sync + 'static,
    {
        assert_eq!(
            params.len(),
            Args::ARITY,
            "constructor takes {} arguments but {} names were given",
            Args::ARITY,
            params.len()
        );
        self.constructors.push(Constructor {
            params: params.to_vec(),
            build: Box::new(move |context, values| Ok(f(Args::import_args(context, values)?))),
        });
        self
    }

    /// Binds `members` to the most specific registered constructor.
    ///
    /// Constructors are tried in descending parameter count, registration
    /// order breaking ties; each parameter must match a distinct member,
    /// compared ASCII case-insensitively. The first fully-bound constructor
    /// wins and the unclaimed members become the tail.
    pub fn bind(
        &self,
        context: &mut ImportContext,
        members: &[NamedBuffer],
    ) -> Result<Bound<T>, ConvertError> {
        let mut order: Vec<&Constructor<T>> = self.constructors.iter().collect();
        order.sort_by(|a, b| b.params.len().cmp(&a.params.len()));
        for ctor in order {
            let Some(picked) = match_params(&ctor.params, members) else {
                continue;
            };
            let values: Vec<&NamedBuffer> = picked.iter().map(|&i| &members[i]).collect();
            let value = (ctor.build)(context, &values)?;
            let tail = members
                .iter()
                .enumerate()
                .filter(|(i, _)| !picked.contains(i))
                .map(|(_, m)| m.clone())
                .collect();
            return Ok(Bound { value, tail });
        }
        Err(ConvertError::NoConstructor {
            type_name: any::type_name::<T>(),
            members: members
                .iter()
                .map(NamedBuffer::name)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Matches each parameter to a distinct member, case-insensitively; `None`
/// when any parameter goes unmatched.
fn match_params(params: &[&'static str], members: &[NamedBuffer]) -> Option<Vec<usize>> {
    let mut picked = Vec::with_capacity(params.len());
    for param in params {
        let found = members
            .iter()
            .enumerate()
            .find(|(i, m)| !picked.contains(i) && m.name().eq_ignore_ascii_case(param))?;
        picked.push(found.0);
    }
    Some(picked)
}

type SetterFn<T> =
    Box<dyn Fn(&mut T, &mut ImportContext, &mut dyn JsonReader) -> Result<(), ConvertError> + Send + Sync>;

/// An [`ObjectBinder`] plus member setters applied to the tail.
///
/// Setters cover the members a constructor does not take; whatever neither
/// claims stays in the returned [`Bound`]'s tail.
pub struct ComponentImporter<T> {
    binder: ObjectBinder<T>,
    setters: Vec<(&'static str, SetterFn<T>)>,
}

impl<T: 'static> ComponentImporter<T> {
    #[must_use]
    pub fn new(binder: ObjectBinder<T>) -> Self {
        Self { binder, setters: Vec::new() }
    }

    /// Registers a setter for the member called `name`.
    #[must_use]
    pub fn field<V, F>(mut self, name: &'static str, apply: F) -> Self
    where
        V: JsonImport,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.setters.push((
            name,
            Box::new(move |target, context, reader| {
                apply(target, context.import::<V>(reader)?);
                Ok(())
            }),
        ));
        self
    }

    /// Imports one object: constructor binding first, then setters over the
    /// tail. Members neither path claims come back in the result's tail.
    pub fn import(
        &self,
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Bound<T>, ConvertError> {
        let members = members_of(reader)?;
        let bound = self.binder.bind(context, &members)?;
        let mut value = bound.value;
        let mut tail = Vec::new();
        for member in bound.tail {
            match self
                .setters
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(member.name()))
            {
                Some((_, setter)) => {
                    let mut reader = member.buffer().read();
                    setter(&mut value, context, &mut reader)?;
                }
                None => tail.push(member),
            }
        }
        Ok(Bound { value, tail })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;

    use super::*;
    use crate::reader::JsonTextReader;

    #[derive(Debug, PartialEq)]
    struct Widget {
        a: i64,
        b: i64,
        c: i64,
    }

    fn widget_binder() -> ObjectBinder<Widget> {
        ObjectBinder::new()
            .constructor(&["a", "b", "c"], |(a, b, c): (i64, i64, i64)| Widget { a, b, c })
            .constructor(&["a", "b"], |(a, b): (i64, i64)| Widget { a, b, c: -1 })
            .constructor(&["a"], |(a,): (i64,)| Widget { a, b: -1, c: -1 })
    }

    fn members(text: &str) -> Vec<NamedBuffer> {
        members_of(&mut JsonTextReader::from_str(text)).unwrap()
    }

    #[test]
    fn most_specific_constructor_wins() {
        let binder = widget_binder();
        let mut ctx = ImportContext::new();
        let bound = binder.bind(&mut ctx, &members("{a: 1, b: 2, c: 3}")).unwrap();
        assert_eq!(bound.value, Widget { a: 1, b: 2, c: 3 });
        assert!(bound.tail.is_empty());
    }

    #[test]
    fn unclaimed_members_become_the_tail() {
        let binder = widget_binder();
        let mut ctx = ImportContext::new();
        let bound = binder.bind(&mut ctx, &members("{a: 1, b: 2, d: 4}")).unwrap();
        assert_eq!(bound.value, Widget { a: 1, b: 2, c: -1 });
        assert_eq!(bound.tail.len(), 1);
        assert_eq!(bound.tail[0].name(), "d");
        assert_eq!(bound.tail_buffer().unwrap().to_string(), r#"{"d":4}"#);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let binder = widget_binder();
        let mut ctx = ImportContext::new();
        let bound = binder.bind(&mut ctx, &members("{A: 1, B: 2}")).unwrap();
        assert_eq!(bound.value, Widget { a: 1, b: 2, c: -1 });
    }

    #[test]
    fn no_constructor_reports_the_members() {
        let binder = widget_binder();
        let mut ctx = ImportContext::new();
        let err = binder.bind(&mut ctx, &members("{x: 1, y: 2}")).unwrap_err();
        match err {
            ConvertError::NoConstructor { members, .. } => assert_eq!(members, "x, y"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_arity_constructor_is_the_fallback() {
        let binder = ObjectBinder::new().constructor(&[], |(): ()| Widget { a: 0, b: 0, c: 0 });
        let mut ctx = ImportContext::new();
        let bound = binder.bind(&mut ctx, &members("{x: 1}")).unwrap();
        assert_eq!(bound.value, Widget { a: 0, b: 0, c: 0 });
        assert_eq!(bound.tail.len(), 1);
    }

    #[test]
    fn parameters_bind_distinct_members() {
        // One member cannot satisfy two parameters of the same name.
        let binder: ObjectBinder<(i64, i64)> =
            ObjectBinder::new().constructor(&["a", "a"], |(x, y): (i64, i64)| (x, y));
        let mut ctx = ImportContext::new();
        assert!(binder.bind(&mut ctx, &members("{a: 1}")).is_err());
        let bound = binder.bind(&mut ctx, &members("{a: 1, A: 2}")).unwrap();
        assert_eq!(bound.value, (1, 2));
    }

    #[test]
    fn setters_consume_the_tail() {
        let importer = ComponentImporter::new(widget_binder())
            .field("c", |w: &mut Widget, c: i64| w.c = c);
        let mut ctx = ImportContext::new();
        let mut reader = JsonTextReader::from_str("{a: 1, b: 2, c: 30, rest: true}");
        let bound = importer.import(&mut ctx, &mut reader).unwrap();
        assert_eq!(bound.value, Widget { a: 1, b: 2, c: 30 });
        assert_eq!(bound.tail.len(), 1);
        assert_eq!(bound.tail[0].name(), "rest");
    }

    #[test]
    fn tail_reader_replays_an_object() {
        let binder = widget_binder();
        let mut ctx = ImportContext::new();
        let bound = binder
            .bind(&mut ctx, &members("{a: 1, d: [4, 5], e: null}"))
            .unwrap();
        let mut tail = bound.tail_reader().unwrap();
        tail.read().unwrap();
        assert_eq!(tail.token_class(), TokenClass::Object);
        assert_eq!(bound.tail_buffer().unwrap().to_string(), r#"{"d":[4,5],"e":null}"#);
    }

    #[test]
    fn binders_are_shareable() {
        // Registered tables are Send + Sync, so one binder can back a
        // process-wide importer.
        let binder = StdArc::new(widget_binder());
        let handle = std::thread::spawn({
            let binder = StdArc::clone(&binder);
            move || {
                let mut ctx = ImportContext::new();
                binder.bind(&mut ctx, &members("{a: 9}")).unwrap().value
            }
        });
        assert_eq!(handle.join().unwrap(), Widget { a: 9, b: -1, c: -1 });
    }
}
