//! Schema model: ordered field descriptors plus the format mode that selects
//! how field addresses are resolved.

pub mod desc;
pub mod registry;
pub mod tag;

pub use desc::{Descriptor, FieldDesc};
pub use registry::SchemaRegistry;
pub use tag::{Category, Primary, TypeTag};

/// Strategy used to resolve field addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatMode {
    /// Descriptors in declaration order; layout is replayed with the target's
    /// alignment rules from the object base.
    Replay,
    /// Bare tag bytes terminated by [`TypeTag::END`]; the most compact
    /// encoding, restricted to flat non-array, non-complex structures.
    Primary,
    /// Each descriptor carries its true compiled offset; fields may appear in
    /// any order and need not be contiguous.
    Offset,
}

/// Schema storage, one variant per format mode.
pub(crate) enum Format<'s, D> {
    Replay(&'s [D]),
    Primary(&'s [u8]),
    Offset(&'s [D]),
}

/// Immutable description of an aggregate's field layout.
///
/// Built once, shared freely: every traversal over any instance of the
/// described shape reads the same schema. Schemas may reference each other
/// through complex descriptors, forming a DAG; cycles are a caller contract
/// violation and are not detected.
pub struct Schema<'s, D: Descriptor<'s> = FieldDesc<'s>> {
    format: Format<'s, D>,
}

impl<'s, D: Descriptor<'s>> Schema<'s, D> {
    pub const fn replay(fields: &'s [D]) -> Schema<'s, D> {
        Schema {
            format: Format::Replay(fields),
        }
    }

    pub const fn offsets(fields: &'s [D]) -> Schema<'s, D> {
        Schema {
            format: Format::Offset(fields),
        }
    }

    pub const fn primary(tags: &'s [u8]) -> Schema<'s, D> {
        Schema {
            format: Format::Primary(tags),
        }
    }

    pub fn mode(&self) -> FormatMode {
        match self.format {
            Format::Replay(_) => FormatMode::Replay,
            Format::Primary(_) => FormatMode::Primary,
            Format::Offset(_) => FormatMode::Offset,
        }
    }

    /// Number of entries; a bare-tag schema counts up to its sentinel.
    pub fn len(&self) -> usize {
        match self.format {
            Format::Replay(fields) | Format::Offset(fields) => fields.len(),
            Format::Primary(tags) => tags
                .iter()
                .position(|&raw| raw == TypeTag::END)
                .unwrap_or(tags.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptor entries; empty for bare-tag schemas.
    pub fn fields(&self) -> &'s [D] {
        match self.format {
            Format::Replay(fields) | Format::Offset(fields) => fields,
            Format::Primary(_) => &[],
        }
    }

    /// Raw tag bytes of a bare-tag schema, sentinel included.
    pub fn tags(&self) -> &'s [u8] {
        match self.format {
            Format::Primary(tags) => tags,
            _ => &[],
        }
    }

    pub fn field_by_name(&self, name: &str) -> Option<&'s D> {
        self.fields().iter().find(|desc| desc.name() == Some(name))
    }

    pub(crate) fn format(&self) -> &Format<'s, D> {
        &self.format
    }
}

#[cfg(test)]
mod tests {
    //! Schema accessors across the three storage variants.
    use super::*;

    static FIELDS: [FieldDesc<'static>; 2] = [
        FieldDesc::scalar(Primary::U32).named("id"),
        FieldDesc::scalar(Primary::F32).named("price"),
    ];

    #[test]
    fn replay_schema_reports_its_entries() {
        let schema: Schema<'_> = Schema::replay(&FIELDS);
        assert_eq!(schema.mode(), FormatMode::Replay, "storage variant fixes the mode");
        assert_eq!(schema.len(), 2, "length comes from the descriptor slice");
        assert_eq!(
            schema.field_by_name("price").map(|d| d.tag.primary()),
            Some(Primary::F32),
            "name lookup should find the declared descriptor"
        );
    }

    #[test]
    fn primary_schema_counts_to_the_sentinel() {
        // trailing bytes after the sentinel are ignored, as in the original
        // bare-tag encoding
        let tags = [
            TypeTag::scalar(Primary::U16).raw(),
            TypeTag::scalar(Primary::U8).raw(),
            TypeTag::END,
            TypeTag::scalar(Primary::U8).raw(),
        ];
        let schema: Schema<'_> = Schema::primary(&tags);
        assert_eq!(schema.len(), 2, "sentinel should terminate the count");
        assert!(schema.fields().is_empty(), "bare-tag schemas expose no descriptors");
    }

    #[test]
    fn unknown_names_miss_cleanly() {
        let schema: Schema<'_> = Schema::replay(&FIELDS);
        assert!(
            schema.field_by_name("missing").is_none(),
            "lookup miss should be None, not an error"
        );
    }
}
