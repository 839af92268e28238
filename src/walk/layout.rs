//! Pure layout arithmetic: natural alignment, occupied bytes, and element
//! size per field shape. Every engine composes these three answers; none of
//! them touch memory.

use crate::arch::Arch;
use crate::schema::{Category, Descriptor, Primary, Schema, TypeTag};

use super::size;

/// Rounds `addr` up to the next multiple of `align`.
pub const fn align_up(addr: usize, align: usize) -> usize {
    if align <= 1 {
        return addr;
    }
    let rem = addr % align;
    if rem == 0 { addr } else { addr + (align - rem) }
}

/// Intrinsic byte size of a primary type. `Complex` has none; its size comes
/// from the nested schema.
pub const fn primary_size(primary: Primary) -> usize {
    match primary {
        Primary::Char | Primary::U8 | Primary::I8 => 1,
        Primary::U16 | Primary::I16 => 2,
        Primary::U32 | Primary::I32 | Primary::F32 => 4,
        Primary::U64 | Primary::I64 | Primary::F64 => 8,
        Primary::Complex => 0,
    }
}

/// Natural alignment of a field on `arch`: element size for value shapes,
/// pointer size for pointer shapes, the nested schema's own alignment for
/// complex value shapes. Always at least 1.
pub fn natural_align<'s, D: Descriptor<'s>>(arch: Arch, desc: &D) -> usize {
    let tag = desc.tag();
    let natural = match tag.category() {
        Category::Scalar | Category::Array | Category::Array2D => match tag.primary() {
            Primary::Complex => return nested_align(arch, desc),
            primary => primary_size(primary),
        },
        Category::Pointer | Category::PointerArray => arch.pointer_bytes(),
    };
    arch.align_cap(natural).max(1)
}

/// Byte size of a single element of the field: the primitive size, the
/// pointer size for pointer shapes, or the nested schema's padded size for
/// complex value shapes.
pub fn item_size<'s, D: Descriptor<'s>>(arch: Arch, desc: &D) -> usize {
    let tag = desc.tag();
    match tag.category() {
        Category::Scalar | Category::Array | Category::Array2D => match tag.primary() {
            Primary::Complex => match desc.nested() {
                Some(nested) => size::normal_size(arch, nested),
                None => 0,
            },
            primary => primary_size(primary),
        },
        Category::Pointer | Category::PointerArray => arch.pointer_bytes(),
    }
}

/// Total bytes the field occupies in its container.
pub fn occupied<'s, D: Descriptor<'s>>(arch: Arch, desc: &D) -> usize {
    let item = item_size(arch, desc);
    match desc.tag().category() {
        Category::Scalar | Category::Pointer => item,
        Category::Array | Category::PointerArray => item * desc.len(),
        Category::Array2D => item * desc.len() * desc.mlen(),
    }
}

/// Largest natural alignment over a schema's entries; what a compiler would
/// pad the aggregate's tail to.
pub fn schema_align<'s, D: Descriptor<'s>>(arch: Arch, schema: &Schema<'s, D>) -> usize {
    let fields = schema.fields();
    if !fields.is_empty() {
        return fields
            .iter()
            .map(|desc| natural_align(arch, desc))
            .max()
            .unwrap_or(1);
    }
    let mut biggest = 1;
    for &raw in schema.tags() {
        if raw == TypeTag::END {
            break;
        }
        if let Some(tag) = TypeTag::from_raw(raw) {
            biggest = biggest.max(tag_align(arch, tag));
        }
    }
    biggest
}

fn nested_align<'s, D: Descriptor<'s>>(arch: Arch, desc: &D) -> usize {
    match desc.nested() {
        Some(nested) => schema_align(arch, nested),
        None => 1,
    }
}

/// Alignment of a bare-tag entry; bare tags carry no lengths, so value and
/// pointer shapes are all that can occur.
pub(crate) fn tag_align(arch: Arch, tag: TypeTag) -> usize {
    let natural = match tag.category() {
        Category::Pointer | Category::PointerArray => arch.pointer_bytes(),
        _ => primary_size(tag.primary()),
    };
    arch.align_cap(natural).max(1)
}

/// Occupied bytes of a bare-tag entry (array shapes occupy nothing without a
/// length and are rejected upstream by the engines).
pub(crate) fn tag_occupied(arch: Arch, tag: TypeTag) -> usize {
    match tag.category() {
        Category::Scalar => primary_size(tag.primary()),
        Category::Pointer => arch.pointer_bytes(),
        Category::Array | Category::PointerArray | Category::Array2D => 0,
    }
}

#[cfg(test)]
mod tests {
    //! Arithmetic spot checks for each category on a few widths.
    use super::*;
    use crate::schema::FieldDesc;

    #[test]
    fn align_up_rounds_to_multiples() {
        assert_eq!(align_up(5, 4), 8, "5 rounds up to the next 4-byte boundary");
        assert_eq!(align_up(8, 4), 8, "aligned addresses stay put");
        assert_eq!(align_up(7, 1), 7, "alignment 1 is the identity");
    }

    #[test]
    fn value_shapes_align_to_their_element() {
        let desc = FieldDesc::array(Primary::U32, 6);
        assert_eq!(
            natural_align(Arch::Bits64, &desc),
            4,
            "arrays align like their element"
        );
        assert_eq!(
            natural_align(Arch::Bits8, &desc),
            1,
            "8-bit targets have no alignment"
        );
    }

    #[test]
    fn pointer_shapes_align_to_the_pointer() {
        let desc = FieldDesc::pointer_array(Primary::Char, 3);
        assert_eq!(
            natural_align(Arch::Bits32, &desc),
            4,
            "pointer arrays align to the pointer width"
        );
        assert_eq!(
            occupied(Arch::Bits32, &desc),
            12,
            "pointer arrays occupy len pointers"
        );
    }

    #[test]
    fn two_d_arrays_multiply_both_extents() {
        let desc = FieldDesc::array_2d(Primary::U16, 4, 8);
        assert_eq!(
            occupied(Arch::Bits64, &desc),
            64,
            "2-D arrays occupy len * mlen elements"
        );
        assert_eq!(item_size(Arch::Bits64, &desc), 2, "item size is one element");
    }

    #[test]
    fn complex_fields_borrow_the_nested_schema_geometry() {
        static INNER_FIELDS: [FieldDesc<'static>; 2] = [
            FieldDesc::scalar(Primary::U64),
            FieldDesc::scalar(Primary::U8),
        ];
        static INNER: crate::schema::Schema<'static> = crate::schema::Schema::replay(&INNER_FIELDS);

        let desc = FieldDesc::complex_array(&INNER, 3);
        assert_eq!(
            natural_align(Arch::Bits64, &desc),
            8,
            "complex alignment is the nested schema's max alignment"
        );
        assert_eq!(
            item_size(Arch::Bits64, &desc),
            16,
            "complex element size is the nested padded size"
        );
        assert_eq!(occupied(Arch::Bits64, &desc), 48, "array of three such elements");
    }
}
