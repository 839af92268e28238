//! Field descriptors: one row of a schema, plus the trait that lets any
//! caller-defined record serve as a descriptor.

use std::fmt;

use super::Schema;
use super::tag::{Category, Primary, TypeTag};

/// Read-only view over one schema entry.
///
/// Engines are generic over this trait, so a caller can attach arbitrary
/// metadata to a descriptor record (documentation, validation bounds, wire
/// ids) and still hand it to scan/size/lookup. A schema graph must use one
/// descriptor type throughout: `nested` returns a schema over `Self`.
// `len` is a field's array extent, not a container size
#[allow(clippy::len_without_is_empty)]
pub trait Descriptor<'s>: Sized + 's {
    fn tag(&self) -> TypeTag;

    /// Element count for array shapes; inner (per-row) extent for 2-D
    /// arrays.
    fn len(&self) -> usize {
        0
    }

    /// Outer (row) extent for 2-D arrays.
    fn mlen(&self) -> usize {
        0
    }

    /// Recorded byte offset, meaningful in offset-format schemas only.
    fn offset(&self) -> usize {
        0
    }

    fn name(&self) -> Option<&'s str> {
        None
    }

    /// Schema describing the element layout of a complex field.
    fn nested(&self) -> Option<&'s Schema<'s, Self>> {
        None
    }
}

/// The stock descriptor. Constructors are `const` so descriptor tables can
/// live in `static`s alongside the schemas that reference them.
#[derive(Clone, Copy)]
pub struct FieldDesc<'s> {
    pub tag: TypeTag,
    pub len: usize,
    pub mlen: usize,
    pub offset: usize,
    pub schema: Option<&'s Schema<'s, FieldDesc<'s>>>,
    pub name: Option<&'s str>,
}

impl<'s> FieldDesc<'s> {
    const fn with_tag(tag: TypeTag) -> FieldDesc<'s> {
        FieldDesc {
            tag,
            len: 0,
            mlen: 0,
            offset: 0,
            schema: None,
            name: None,
        }
    }

    pub const fn scalar(primary: Primary) -> FieldDesc<'s> {
        FieldDesc::with_tag(TypeTag::new(Category::Scalar, primary))
    }

    pub const fn pointer(primary: Primary) -> FieldDesc<'s> {
        FieldDesc::with_tag(TypeTag::new(Category::Pointer, primary))
    }

    pub const fn array(primary: Primary, len: usize) -> FieldDesc<'s> {
        let mut desc = FieldDesc::with_tag(TypeTag::new(Category::Array, primary));
        desc.len = len;
        desc
    }

    pub const fn pointer_array(primary: Primary, len: usize) -> FieldDesc<'s> {
        let mut desc = FieldDesc::with_tag(TypeTag::new(Category::PointerArray, primary));
        desc.len = len;
        desc
    }

    /// `mlen` rows of `len` elements, contiguous and row-major.
    pub const fn array_2d(primary: Primary, len: usize, mlen: usize) -> FieldDesc<'s> {
        let mut desc = FieldDesc::with_tag(TypeTag::new(Category::Array2D, primary));
        desc.len = len;
        desc.mlen = mlen;
        desc
    }

    pub const fn complex(schema: &'s Schema<'s, FieldDesc<'s>>) -> FieldDesc<'s> {
        let mut desc = FieldDesc::with_tag(TypeTag::new(Category::Scalar, Primary::Complex));
        desc.schema = Some(schema);
        desc
    }

    pub const fn complex_pointer(schema: &'s Schema<'s, FieldDesc<'s>>) -> FieldDesc<'s> {
        let mut desc = FieldDesc::with_tag(TypeTag::new(Category::Pointer, Primary::Complex));
        desc.schema = Some(schema);
        desc
    }

    pub const fn complex_array(
        schema: &'s Schema<'s, FieldDesc<'s>>,
        len: usize,
    ) -> FieldDesc<'s> {
        let mut desc = FieldDesc::with_tag(TypeTag::new(Category::Array, Primary::Complex));
        desc.schema = Some(schema);
        desc.len = len;
        desc
    }

    pub const fn complex_pointer_array(
        schema: &'s Schema<'s, FieldDesc<'s>>,
        len: usize,
    ) -> FieldDesc<'s> {
        let mut desc = FieldDesc::with_tag(TypeTag::new(Category::PointerArray, Primary::Complex));
        desc.schema = Some(schema);
        desc.len = len;
        desc
    }

    pub const fn complex_array_2d(
        schema: &'s Schema<'s, FieldDesc<'s>>,
        len: usize,
        mlen: usize,
    ) -> FieldDesc<'s> {
        let mut desc = FieldDesc::with_tag(TypeTag::new(Category::Array2D, Primary::Complex));
        desc.schema = Some(schema);
        desc.len = len;
        desc.mlen = mlen;
        desc
    }

    pub const fn named(mut self, name: &'s str) -> FieldDesc<'s> {
        self.name = Some(name);
        self
    }

    /// Records the field's true compiled offset for offset-format schemas.
    pub const fn at(mut self, offset: usize) -> FieldDesc<'s> {
        self.offset = offset;
        self
    }
}

impl<'s> Descriptor<'s> for FieldDesc<'s> {
    fn tag(&self) -> TypeTag {
        self.tag
    }

    fn len(&self) -> usize {
        self.len
    }

    fn mlen(&self) -> usize {
        self.mlen
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn name(&self) -> Option<&'s str> {
        self.name
    }

    fn nested(&self) -> Option<&'s Schema<'s, FieldDesc<'s>>> {
        self.schema
    }
}

// schemas form a graph, so the nested reference renders as its format mode
// rather than recursing
impl fmt::Debug for FieldDesc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDesc")
            .field("tag", &self.tag)
            .field("len", &self.len)
            .field("mlen", &self.mlen)
            .field("offset", &self.offset)
            .field("name", &self.name)
            .field("schema", &self.schema.map(|schema| schema.mode()))
            .finish()
    }
}
