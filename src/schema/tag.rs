//! Packed 8-bit type tags: a shape category in the high three bits and a
//! primary type in the low five.

/// Shape of a field within its container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Category {
    Scalar = 0,
    Pointer = 1,
    Array = 2,
    PointerArray = 3,
    Array2D = 4,
}

impl Category {
    pub const COUNT: usize = 5;

    pub const fn from_bits(bits: u8) -> Option<Category> {
        match bits {
            0 => Some(Category::Scalar),
            1 => Some(Category::Pointer),
            2 => Some(Category::Array),
            3 => Some(Category::PointerArray),
            4 => Some(Category::Array2D),
            _ => None,
        }
    }
}

/// Element type of a field. `Complex` marks a field whose layout is
/// described by another schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Primary {
    Char = 0,
    U8 = 1,
    I8 = 2,
    U16 = 3,
    I16 = 4,
    U32 = 5,
    I32 = 6,
    U64 = 7,
    I64 = 8,
    F32 = 9,
    F64 = 10,
    Complex = 11,
}

impl Primary {
    pub const COUNT: usize = 12;

    pub const fn from_bits(bits: u8) -> Option<Primary> {
        match bits {
            0 => Some(Primary::Char),
            1 => Some(Primary::U8),
            2 => Some(Primary::I8),
            3 => Some(Primary::U16),
            4 => Some(Primary::I16),
            5 => Some(Primary::U32),
            6 => Some(Primary::I32),
            7 => Some(Primary::U64),
            8 => Some(Primary::I64),
            9 => Some(Primary::F32),
            10 => Some(Primary::F64),
            11 => Some(Primary::Complex),
            _ => None,
        }
    }
}

const PRIMARY_MASK: u8 = 0x1F;
const CATEGORY_SHIFT: u32 = 5;

/// One byte of field shape: `category << 5 | primary`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag(u8);

impl TypeTag {
    /// Terminates a bare-tag format sequence.
    pub const END: u8 = 0xFF;

    pub const fn new(category: Category, primary: Primary) -> TypeTag {
        TypeTag((category as u8) << CATEGORY_SHIFT | primary as u8)
    }

    pub const fn scalar(primary: Primary) -> TypeTag {
        TypeTag::new(Category::Scalar, primary)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn from_raw(raw: u8) -> Option<TypeTag> {
        let category = Category::from_bits(raw >> CATEGORY_SHIFT);
        let primary = Primary::from_bits(raw & PRIMARY_MASK);
        match (category, primary) {
            (Some(_), Some(_)) => Some(TypeTag(raw)),
            _ => None,
        }
    }

    pub const fn category(self) -> Category {
        match Category::from_bits(self.0 >> CATEGORY_SHIFT) {
            Some(category) => category,
            None => unreachable!(),
        }
    }

    pub const fn primary(self) -> Primary {
        match Primary::from_bits(self.0 & PRIMARY_MASK) {
            Some(primary) => primary,
            None => unreachable!(),
        }
    }

    pub const fn is_complex(self) -> bool {
        matches!(self.primary(), Primary::Complex)
    }
}

#[cfg(test)]
mod tests {
    //! Tag packing must match the documented bit layout exactly.
    use super::*;

    #[test]
    fn tag_packs_category_high_primary_low() {
        // the wire encoding is category << 5 | primary
        let tag = TypeTag::new(Category::Array2D, Primary::F64);
        assert_eq!(tag.raw(), 4 << 5 | 10, "raw byte should pack both halves");
        assert_eq!(tag.category(), Category::Array2D, "category should round-trip");
        assert_eq!(tag.primary(), Primary::F64, "primary should round-trip");
    }

    #[test]
    fn from_raw_rejects_unknown_bits() {
        // category 5 and primary 12 upward are unassigned
        assert!(
            TypeTag::from_raw(5 << 5).is_none(),
            "unassigned categories must not decode"
        );
        assert!(
            TypeTag::from_raw(12).is_none(),
            "unassigned primaries must not decode"
        );
        assert!(
            TypeTag::from_raw(TypeTag::END).is_none(),
            "the sentinel byte is not a tag"
        );
    }

    #[test]
    fn every_assigned_pair_round_trips() {
        for cat in 0..Category::COUNT as u8 {
            for prim in 0..Primary::COUNT as u8 {
                let raw = cat << 5 | prim;
                let tag = TypeTag::from_raw(raw).expect("assigned pair should decode");
                assert_eq!(tag.raw(), raw, "round-trip should preserve the raw byte");
            }
        }
    }
}
