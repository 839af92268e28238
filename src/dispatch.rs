//! Dispatch layer: how a resolved field is handed to caller logic. Three
//! calling conventions, selected once per traversal; tables are plain fn
//! pointers so they can live in `const`s.

use crate::error::ScanResult;
use crate::schema::{Category, Primary};
use crate::walk::scan::{Field, Scanner};

/// Per-field handler. Returning an error aborts the remainder of the walk
/// and is propagated to the original caller unchanged.
pub type OnField = fn(&mut Scanner<'_>, &Field<'_>) -> ScanResult;

/// One optional handler per primary type, plus the begin/end pair that
/// brackets every complex element. Category-agnostic (the compact form).
///
/// Construct with functional update over [`ScanFns::EMPTY`]:
///
/// ```ignore
/// const FNS: ScanFns = ScanFns { on_u32: Some(put_u32), ..ScanFns::EMPTY };
/// ```
#[derive(Clone, Copy)]
pub struct ScanFns {
    pub on_char: Option<OnField>,
    pub on_u8: Option<OnField>,
    pub on_i8: Option<OnField>,
    pub on_u16: Option<OnField>,
    pub on_i16: Option<OnField>,
    pub on_u32: Option<OnField>,
    pub on_i32: Option<OnField>,
    pub on_u64: Option<OnField>,
    pub on_i64: Option<OnField>,
    pub on_f32: Option<OnField>,
    pub on_f64: Option<OnField>,
    pub complex_begin: Option<OnField>,
    pub complex_end: Option<OnField>,
}

impl ScanFns {
    pub const EMPTY: ScanFns = ScanFns {
        on_char: None,
        on_u8: None,
        on_i8: None,
        on_u16: None,
        on_i16: None,
        on_u32: None,
        on_i32: None,
        on_u64: None,
        on_i64: None,
        on_f32: None,
        on_f64: None,
        complex_begin: None,
        complex_end: None,
    };

    /// Same handler for every primary type; begin/end stay unset.
    pub const fn uniform(handler: OnField) -> ScanFns {
        ScanFns {
            on_char: Some(handler),
            on_u8: Some(handler),
            on_i8: Some(handler),
            on_u16: Some(handler),
            on_i16: Some(handler),
            on_u32: Some(handler),
            on_i32: Some(handler),
            on_u64: Some(handler),
            on_i64: Some(handler),
            on_f32: Some(handler),
            on_f64: Some(handler),
            complex_begin: None,
            complex_end: None,
        }
    }

    pub fn for_primary(&self, primary: Primary) -> Option<OnField> {
        match primary {
            Primary::Char => self.on_char,
            Primary::U8 => self.on_u8,
            Primary::I8 => self.on_i8,
            Primary::U16 => self.on_u16,
            Primary::I16 => self.on_i16,
            Primary::U32 => self.on_u32,
            Primary::I32 => self.on_i32,
            Primary::U64 => self.on_u64,
            Primary::I64 => self.on_i64,
            Primary::F32 => self.on_f32,
            Primary::F64 => self.on_f64,
            Primary::Complex => None,
        }
    }
}

/// One handler table per category (the driver form): fully-typed dispatch
/// with no branching in the caller's handlers.
#[derive(Clone, Copy)]
pub struct ScanDriver<'t> {
    pub scalar: &'t ScanFns,
    pub pointer: &'t ScanFns,
    pub array: &'t ScanFns,
    pub pointer_array: &'t ScanFns,
    pub array_2d: &'t ScanFns,
}

impl<'t> ScanDriver<'t> {
    /// The same table for every category.
    pub const fn uniform(fns: &'t ScanFns) -> ScanDriver<'t> {
        ScanDriver {
            scalar: fns,
            pointer: fns,
            array: fns,
            pointer_array: fns,
            array_2d: fns,
        }
    }

    pub fn category(&self, category: Category) -> &'t ScanFns {
        match category {
            Category::Scalar => self.scalar,
            Category::Pointer => self.pointer,
            Category::Array => self.array,
            Category::PointerArray => self.pointer_array,
            Category::Array2D => self.array_2d,
        }
    }
}

/// Calling convention for a traversal, chosen once per call.
///
/// `Callback` routes every leaf field to a single polymorphic handler and
/// never emits complex begin/end notifications (a lone callback cannot tell
/// the two edges apart); `Driver` and `Compact` have dedicated slots for
/// them.
#[derive(Clone, Copy)]
pub enum Dispatch<'t> {
    Callback(OnField),
    Driver(&'t ScanDriver<'t>),
    Compact(&'t ScanFns),
}

impl Dispatch<'_> {
    pub(crate) fn field(&self, scanner: &mut Scanner<'_>, field: &Field<'_>) -> ScanResult {
        let handler = match self {
            Dispatch::Callback(handler) => Some(*handler),
            Dispatch::Driver(driver) => driver
                .category(field.tag.category())
                .for_primary(field.tag.primary()),
            Dispatch::Compact(fns) => fns.for_primary(field.tag.primary()),
        };
        match handler {
            Some(handler) => handler(scanner, field),
            None => Ok(()),
        }
    }

    pub(crate) fn complex_begin(&self, scanner: &mut Scanner<'_>, field: &Field<'_>) -> ScanResult {
        let handler = match self {
            Dispatch::Callback(_) => None,
            Dispatch::Driver(driver) => driver.category(field.tag.category()).complex_begin,
            Dispatch::Compact(fns) => fns.complex_begin,
        };
        match handler {
            Some(handler) => handler(scanner, field),
            None => Ok(()),
        }
    }

    pub(crate) fn complex_end(&self, scanner: &mut Scanner<'_>, field: &Field<'_>) -> ScanResult {
        let handler = match self {
            Dispatch::Callback(_) => None,
            Dispatch::Driver(driver) => driver.category(field.tag.category()).complex_end,
            Dispatch::Compact(fns) => fns.complex_end,
        };
        match handler {
            Some(handler) => handler(scanner, field),
            None => Ok(()),
        }
    }
}
