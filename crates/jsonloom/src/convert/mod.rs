//! Converting between JSON token streams and Rust values.
//!
//! Conversion has two layers. The compile-time layer is the pair of traits
//! [`JsonImport`] and [`JsonExport`], implemented here for scalars,
//! collections, and buffers, and by applications for their own types. The
//! runtime layer is a pair of registries on [`ImportContext`] and
//! [`ExportContext`] keyed by [`TypeId`]: an explicit registration overrides
//! the static impl for that type within the context, and a process-wide
//! stock table resolves dynamic lookups for the common types.

mod collections;
mod object;
mod scalars;

use std::{
    any::{self, Any, TypeId},
    collections::HashMap,
    marker::PhantomData,
    sync::{Arc, OnceLock},
};

use log::debug;
use thiserror::Error;

pub use collections::JsonMemberKey;
pub use object::{members_of, BindArgs, Bound, ComponentImporter, ObjectBinder};

use crate::{
    error::{ReadError, WriteError},
    reader::JsonReader,
    token::TokenClass,
    writer::JsonWriter,
};

/// An error raised while converting between tokens and values.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("no importer registered for {type_name}")]
    NoImporter { type_name: &'static str },
    #[error("no exporter registered for {type_name}")]
    NoExporter { type_name: &'static str },
    #[error("importer for {type_name} produced a value of another type")]
    ImporterMismatch { type_name: &'static str },
    #[error("found {found} where {expected} was expected")]
    UnexpectedShape {
        expected: &'static str,
        found: TokenClass,
    },
    #[error("number {text} does not fit {target}")]
    NumberShape { target: &'static str, text: String },
    #[error("cannot read {target} from '{text}'")]
    InvalidText { target: &'static str, text: String },
    #[error("no constructor of {type_name} can be bound from members [{members}]")]
    NoConstructor {
        type_name: &'static str,
        members: String,
    },
    #[error("circular reference detected during export")]
    CircularReference,
}

/// A type that can be built from a token stream.
///
/// Implementations consume exactly one value and leave the reader positioned
/// after it. Implemented for the scalar and collection types in this module;
/// applications implement it for their own types, typically with an
/// [`ObjectBinder`].
pub trait JsonImport: Sized + 'static {
    fn import_json(
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Self, ConvertError>;
}

/// A type that can write itself as exactly one JSON value.
pub trait JsonExport: 'static {
    fn export_json(
        &self,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError>;
}

/// Type-erased importer used by the runtime registries.
pub trait Importer: Send + Sync {
    /// Name of the produced type, for diagnostics.
    fn target(&self) -> &'static str;

    fn import_value(
        &self,
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Box<dyn Any>, ConvertError>;
}

/// Type-erased exporter used by the runtime registries.
pub trait Exporter: Send + Sync {
    /// Name of the accepted type, for diagnostics.
    fn source(&self) -> &'static str;

    fn export_value(
        &self,
        value: &dyn Any,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError>;
}

struct TypedImporter<T, F> {
    import: F,
    marker: PhantomData<fn() -> T>,
}

impl<T, F> Importer for TypedImporter<T, F>
where
    T: 'static,
    F: Fn(&mut ImportContext, &mut dyn JsonReader) -> Result<T, ConvertError> + Send + Sync,
{
    fn target(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn import_value(
        &self,
        context: &mut ImportContext,
        reader: &mut dyn JsonReader,
    ) -> Result<Box<dyn Any>, ConvertError> {
        Ok(Box::new((self.import)(context, reader)?))
    }
}

struct TypedExporter<T, F> {
    export: F,
    marker: PhantomData<fn() -> T>,
}

impl<T, F> Exporter for TypedExporter<T, F>
where
    T: 'static,
    F: Fn(&T, &mut ExportContext, &mut dyn JsonWriter) -> Result<(), ConvertError> + Send + Sync,
{
    fn source(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn export_value(
        &self,
        value: &dyn Any,
        context: &mut ExportContext,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        let value = value
            .downcast_ref::<T>()
            .ok_or(ConvertError::NoExporter { type_name: any::type_name::<T>() })?;
        (self.export)(value, context, writer)
    }
}

fn stock_importers() -> &'static HashMap<TypeId, Arc<dyn Importer>> {
    static STOCK: OnceLock<HashMap<TypeId, Arc<dyn Importer>>> = OnceLock::new();
    STOCK.get_or_init(|| {
        debug!("building stock importer table");
        let mut table: HashMap<TypeId, Arc<dyn Importer>> = HashMap::new();
        macro_rules! add {
            ($($t:ty),* $(,)?) => {$(
                table.insert(
                    TypeId::of::<$t>(),
                    Arc::new(TypedImporter {
                        import: <$t as JsonImport>::import_json
                            as fn(&mut ImportContext, &mut dyn JsonReader) -> Result<$t, ConvertError>,
                        marker: PhantomData,
                    }),
                );
            )*};
        }
        add!(
            i8, i16, i32, i64, i128, isize,
            u8, u16, u32, u64, u128, usize,
            f32, f64, bool, char, String,
            chrono::DateTime<chrono::Utc>, chrono::NaiveDateTime,
            uuid::Uuid, url::Url,
            crate::buffer::JsonBuffer,
        );
        table
    })
}

fn stock_exporters() -> &'static HashMap<TypeId, Arc<dyn Exporter>> {
    static STOCK: OnceLock<HashMap<TypeId, Arc<dyn Exporter>>> = OnceLock::new();
    STOCK.get_or_init(|| {
        debug!("building stock exporter table");
        let mut table: HashMap<TypeId, Arc<dyn Exporter>> = HashMap::new();
        macro_rules! add {
            ($($t:ty),* $(,)?) => {$(
                table.insert(
                    TypeId::of::<$t>(),
                    Arc::new(TypedExporter {
                        export: <$t as JsonExport>::export_json
                            as fn(&$t, &mut ExportContext, &mut dyn JsonWriter) -> Result<(), ConvertError>,
                        marker: PhantomData,
                    }),
                );
            )*};
        }
        add!(
            i8, i16, i32, i64, i128, isize,
            u8, u16, u32, u64, u128, usize,
            f32, f64, bool, char, String,
            chrono::DateTime<chrono::Utc>, chrono::NaiveDateTime,
            uuid::Uuid, url::Url,
            crate::buffer::JsonBuffer,
        );
        table
    })
}

/// Type-keyed scratch state carried across one conversion.
#[derive(Default)]
struct Items {
    entries: HashMap<TypeId, Box<dyn Any>>,
}

impl Items {
    fn get<T: 'static>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }

    fn get_mut_or_default<T: Default + 'static>(&mut self) -> &mut T {
        self.entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut()
            .expect("items entry holds its key's type")
    }
}

/// State for one import: the importer registry and the items side-channel.
#[derive(Default)]
pub struct ImportContext {
    registry: HashMap<TypeId, Arc<dyn Importer>>,
    items: Items,
}

impl ImportContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `import` for `T`, overriding both the stock table and `T`'s
    /// own [`JsonImport`] impl within this context.
    pub fn register<T, F>(&mut self, import: F)
    where
        T: 'static,
        F: Fn(&mut ImportContext, &mut dyn JsonReader) -> Result<T, ConvertError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.insert(
            TypeId::of::<T>(),
            Arc::new(TypedImporter { import, marker: PhantomData }),
        );
    }

    /// Looks up an importer for `type_id`: context registrations first, then
    /// the stock table. Stock hits are cached in this context.
    pub fn find_importer(&mut self, type_id: TypeId) -> Option<Arc<dyn Importer>> {
        if let Some(importer) = self.registry.get(&type_id) {
            return Some(Arc::clone(importer));
        }
        let importer = Arc::clone(stock_importers().get(&type_id)?);
        debug!("stock importer resolved for {}", importer.target());
        self.registry.insert(type_id, Arc::clone(&importer));
        Some(importer)
    }

    /// Imports a `T` from the reader's current value.
    pub fn import<T: JsonImport>(
        &mut self,
        reader: &mut dyn JsonReader,
    ) -> Result<T, ConvertError> {
        match self.find_importer(TypeId::of::<T>()) {
            Some(importer) => importer
                .import_value(self, reader)?
                .downcast()
                .map(|boxed| *boxed)
                .map_err(|_| ConvertError::ImporterMismatch {
                    type_name: any::type_name::<T>(),
                }),
            None => T::import_json(self, reader),
        }
    }

    /// Imports through the registries only, for callers without a static
    /// type. Fails with `NoImporter` when neither the context nor the stock
    /// table knows `type_id`.
    pub fn import_dyn(
        &mut self,
        type_id: TypeId,
        type_name: &'static str,
        reader: &mut dyn JsonReader,
    ) -> Result<Box<dyn Any>, ConvertError> {
        match self.find_importer(type_id) {
            Some(importer) => importer.import_value(self, reader),
            None => Err(ConvertError::NoImporter { type_name }),
        }
    }

    /// A shared item of the conversion's scratch state.
    pub fn item<T: 'static>(&self) -> Option<&T> {
        self.items.get()
    }

    /// The scratch item of type `T`, created from `Default` on first use.
    pub fn item_mut_or_default<T: Default + 'static>(&mut self) -> &mut T {
        self.items.get_mut_or_default()
    }
}

/// State for one export, mirroring [`ImportContext`].
#[derive(Default)]
pub struct ExportContext {
    registry: HashMap<TypeId, Arc<dyn Exporter>>,
    items: Items,
}

impl ExportContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `export` for `T`, overriding both the stock table and `T`'s
    /// own [`JsonExport`] impl within this context.
    pub fn register<T, F>(&mut self, export: F)
    where
        T: 'static,
        F: Fn(&T, &mut ExportContext, &mut dyn JsonWriter) -> Result<(), ConvertError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.insert(
            TypeId::of::<T>(),
            Arc::new(TypedExporter { export, marker: PhantomData }),
        );
    }

    /// Looks up an exporter for `type_id`, caching stock hits.
    pub fn find_exporter(&mut self, type_id: TypeId) -> Option<Arc<dyn Exporter>> {
        if let Some(exporter) = self.registry.get(&type_id) {
            return Some(Arc::clone(exporter));
        }
        let exporter = Arc::clone(stock_exporters().get(&type_id)?);
        debug!("stock exporter resolved for {}", exporter.source());
        self.registry.insert(type_id, Arc::clone(&exporter));
        Some(exporter)
    }

    /// Exports `value` as one JSON value.
    pub fn export<T: JsonExport>(
        &mut self,
        value: &T,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        match self.find_exporter(TypeId::of::<T>()) {
            Some(exporter) => exporter.export_value(value, self, writer),
            None => value.export_json(self, writer),
        }
    }

    /// Exports through the registries only. Fails with `NoExporter` when
    /// the value's type is not registered.
    pub fn export_dyn(
        &mut self,
        type_name: &'static str,
        value: &dyn Any,
        writer: &mut dyn JsonWriter,
    ) -> Result<(), ConvertError> {
        match self.find_exporter(value.type_id()) {
            Some(exporter) => exporter.export_value(value, self, writer),
            None => Err(ConvertError::NoExporter { type_name }),
        }
    }

    /// A shared item of the conversion's scratch state.
    pub fn item<T: 'static>(&self) -> Option<&T> {
        self.items.get()
    }

    /// The scratch item of type `T`, created from `Default` on first use.
    pub fn item_mut_or_default<T: Default + 'static>(&mut self) -> &mut T {
        self.items.get_mut_or_default()
    }
}

/// Imports a `T` from JSON text with a fresh context.
pub fn import_from_str<T: JsonImport>(text: &str) -> Result<T, ConvertError> {
    ImportContext::new().import(&mut crate::reader::JsonTextReader::from_str(text))
}

/// Exports `value` to compact JSON text with a fresh context.
pub fn export_to_string<T: JsonExport>(value: &T) -> Result<String, ConvertError> {
    let mut writer = crate::writer::JsonTextWriter::new(Vec::new());
    ExportContext::new().export(value, &mut writer)?;
    writer.close()?;
    // The text writer only ever emits valid UTF-8.
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::JsonTextReader;

    #[test]
    fn context_registration_overrides_the_static_impl() {
        let mut ctx = ImportContext::new();
        ctx.register::<i32, _>(|_, reader| {
            let text = reader.read_number()?;
            Ok(text.parse::<i32>().unwrap() * 10)
        });
        let mut reader = JsonTextReader::from_str("4");
        let value: i32 = ctx.import(&mut reader).unwrap();
        assert_eq!(value, 40);
    }

    #[test]
    fn stock_importers_cover_common_types() {
        let mut ctx = ImportContext::new();
        assert!(ctx.find_importer(TypeId::of::<u64>()).is_some());
        assert!(ctx.find_importer(TypeId::of::<String>()).is_some());
        assert!(ctx.find_importer(TypeId::of::<uuid::Uuid>()).is_some());
        assert!(ctx.find_importer(TypeId::of::<Vec<i32>>()).is_none());
    }

    #[test]
    fn import_dyn_reports_unknown_types() {
        struct Opaque;
        let mut ctx = ImportContext::new();
        let mut reader = JsonTextReader::from_str("1");
        assert!(matches!(
            ctx.import_dyn(TypeId::of::<Opaque>(), "Opaque", &mut reader),
            Err(ConvertError::NoImporter { type_name: "Opaque" })
        ));
    }

    #[test]
    fn items_are_created_on_demand() {
        let mut ctx = ImportContext::new();
        assert!(ctx.item::<Vec<u8>>().is_none());
        ctx.item_mut_or_default::<Vec<u8>>().push(1);
        assert_eq!(ctx.item::<Vec<u8>>(), Some(&vec![1]));
    }

    #[test]
    fn convenience_round_trip() {
        let value: Vec<i32> = import_from_str("[1, 2, 3]").unwrap();
        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(export_to_string(&value).unwrap(), "[1,2,3]");
    }
}
