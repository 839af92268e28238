//! Schema-driven runtime reflection over C-style structs.
//!
//! A [`Schema`] is a shared, immutable description of an aggregate's field
//! layout: one [`TypeTag`] per field packing a shape category and a primary
//! type, plus the lengths and nested schemas the shape needs. The walk
//! engines replay the host compiler's layout rules over that description to
//! visit every field of a live object, handing each one to caller-supplied
//! handler tables together with its address, so the same schema drives
//! serializers, deserializers, pretty printers, and field patching without
//! any per-type code.
//!
//! Three schema formats trade generality for footprint: replay schemas
//! recompute the layout from descriptors in declaration order, offset
//! schemas carry each field's true compiled offset, and bare-tag schemas
//! are a sentinel-terminated byte string for flat structs. Size queries
//! answer for foreign target widths as well as the host; see [`Arch`].

pub mod arch;
pub mod dispatch;
pub mod error;
pub mod fmt;
pub mod schema;
pub mod walk;

pub use arch::Arch;
pub use dispatch::{Dispatch, OnField, ScanDriver, ScanFns};
pub use error::{ScanError, ScanResult};
pub use fmt::dump;
pub use schema::{
    Category, Descriptor, FieldDesc, FormatMode, Primary, Schema, SchemaRegistry, TypeTag,
};
pub use walk::lookup::ResolvedField;
pub use walk::scan::{Field, Scanner, Value};
pub use walk::size::SizeMode;
