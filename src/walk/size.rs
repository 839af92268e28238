//! Struct size computation: the padded size the originating compiler would
//! report, or the minimum packed wire size.

use crate::arch::Arch;
use crate::schema::{Descriptor, Format, Schema, TypeTag};

use super::layout;

/// Which of the two sizes to compute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeMode {
    /// ABI-equivalent `sizeof`, inter-field and trailing padding included.
    Normal,
    /// Sum of field bytes with no padding at all; the natural wire size of a
    /// tightly packed serialization.
    Packed,
}

impl<'s, D: Descriptor<'s>> Schema<'s, D> {
    /// Size of the described aggregate on the host architecture.
    pub fn size(&self, mode: SizeMode) -> usize {
        self.size_for(Arch::HOST, mode)
    }

    /// Size of the described aggregate on an arbitrary target width.
    pub fn size_for(&self, arch: Arch, mode: SizeMode) -> usize {
        match mode {
            SizeMode::Normal => normal_size(arch, self),
            SizeMode::Packed => packed_size(arch, self),
        }
    }
}

pub(crate) fn normal_size<'s, D: Descriptor<'s>>(arch: Arch, schema: &Schema<'s, D>) -> usize {
    match schema.format() {
        Format::Replay(fields) => replay_normal(arch, fields),
        Format::Primary(tags) => primary_normal(arch, tags),
        Format::Offset(fields) => offset_normal(arch, fields),
    }
}

pub(crate) fn packed_size<'s, D: Descriptor<'s>>(arch: Arch, schema: &Schema<'s, D>) -> usize {
    match schema.format() {
        Format::Replay(fields) | Format::Offset(fields) => fields
            .iter()
            .map(|desc| layout::occupied(arch, desc))
            .sum(),
        Format::Primary(tags) => tags
            .iter()
            .take_while(|&&raw| raw != TypeTag::END)
            .filter_map(|&raw| TypeTag::from_raw(raw))
            .map(|tag| layout::tag_occupied(arch, tag))
            .sum(),
    }
}

fn replay_normal<'s, D: Descriptor<'s>>(arch: Arch, fields: &[D]) -> usize {
    let mut cursor = 0;
    let mut biggest = 1;
    for desc in fields {
        let align = layout::natural_align(arch, desc);
        biggest = biggest.max(align);
        cursor = layout::align_up(cursor, align);
        cursor += layout::occupied(arch, desc);
    }
    layout::align_up(cursor, biggest)
}

fn primary_normal(arch: Arch, tags: &[u8]) -> usize {
    let mut cursor = 0;
    let mut biggest = 1;
    for &raw in tags {
        if raw == TypeTag::END {
            break;
        }
        let Some(tag) = TypeTag::from_raw(raw) else {
            continue;
        };
        let align = layout::tag_align(arch, tag);
        biggest = biggest.max(align);
        cursor = layout::align_up(cursor, align);
        cursor += layout::tag_occupied(arch, tag);
    }
    layout::align_up(cursor, biggest)
}

/// Offset schemas make no ordering or contiguity promise, so the size is the
/// furthest byte any entry reaches, padded to the schema's alignment.
fn offset_normal<'s, D: Descriptor<'s>>(arch: Arch, fields: &[D]) -> usize {
    let mut end = 0;
    let mut biggest = 1;
    for desc in fields {
        end = end.max(desc.offset() + layout::occupied(arch, desc));
        biggest = biggest.max(layout::natural_align(arch, desc));
    }
    layout::align_up(end, biggest)
}
