//! Field lookup: resolve a single descriptor to its address inside a live
//! object, or traverse just that one field, without walking the rest.

use smallvec::SmallVec;

use crate::arch::Arch;
use crate::dispatch::Dispatch;
use crate::error::ScanResult;
use crate::schema::{Category, Descriptor, Format, Schema, TypeTag};

use super::scan::{Field, Scanner, scan_complex};
use super::{layout, size};

/// A field located within a concrete object.
///
/// Carries the same identity a full walk would have delivered for it: the
/// flattened leaf index, the index its layer started at, and the entry
/// positions from the root schema down to the field.
#[derive(Clone, Debug)]
pub struct ResolvedField<'s> {
    pub addr: *mut u8,
    pub tag: TypeTag,
    pub len: usize,
    pub mlen: usize,
    pub name: Option<&'s str>,
    pub index: usize,
    pub layer_start: usize,
    pub path: SmallVec<[usize; 4]>,
}

impl<'s, D: Descriptor<'s>> Schema<'s, D> {
    /// Resolves `target` to its address inside the object at `obj`.
    ///
    /// `target` is matched by identity: it must be one of the descriptor
    /// records this schema graph was built from. A descriptor reached through
    /// a complex array matches in the first element, never a later one.
    ///
    /// # Safety
    /// `obj` must point to a live object laid out as this schema describes on
    /// the host; any pointer field on the path to `target` must hold a valid
    /// pointer to its described target.
    pub unsafe fn get_field(&self, obj: *mut u8, target: &D) -> Option<ResolvedField<'s>> {
        let mut var_index = 0;
        let mut path = SmallVec::new();
        unsafe { find_in_layer(self, obj, target, &mut var_index, 0, &mut path) }
    }

    /// Resolves a bare-tag entry to its address inside the object at `obj`.
    ///
    /// `target` must be one of the tag bytes this bare-tag schema was built
    /// over; descriptor-format schemas always miss.
    ///
    /// # Safety
    /// `obj` must point to a live object laid out as this schema describes on
    /// the host.
    pub unsafe fn get_field_tag(&self, obj: *mut u8, target: &u8) -> Option<ResolvedField<'s>> {
        let Format::Primary(tags) = self.format() else {
            return None;
        };
        let arch = Arch::HOST;
        let mut cursor = 0;
        let mut index = 0;
        for (pos, raw) in tags.iter().enumerate() {
            if *raw == TypeTag::END {
                break;
            }
            let Some(tag) = TypeTag::from_raw(*raw) else {
                break;
            };
            if tag.is_complex() || !matches!(tag.category(), Category::Scalar | Category::Pointer)
            {
                break;
            }
            cursor = layout::align_up(cursor, layout::tag_align(arch, tag));
            if std::ptr::eq(raw, target) {
                let mut path = SmallVec::new();
                path.push(pos);
                return Some(ResolvedField {
                    addr: unsafe { obj.add(cursor) },
                    tag,
                    len: 0,
                    mlen: 0,
                    name: None,
                    index,
                    layer_start: 0,
                    path,
                });
            }
            index += 1;
            cursor += layout::tag_occupied(arch, tag);
        }
        None
    }

    /// Traverses just the field `target` resolves to: a leaf is delivered
    /// once, a complex field has its whole subtree walked. Returns `None`
    /// when `target` is not part of this schema graph.
    ///
    /// The scanner counters are seeded so handlers observe the same index,
    /// layer start, and depth a full walk would have shown them.
    ///
    /// # Safety
    /// Same contract as [`Schema::scan`], plus the [`Schema::get_field`]
    /// contract for locating `target`.
    pub unsafe fn scan_field(
        &self,
        scanner: &mut Scanner<'_>,
        dispatch: &Dispatch<'_>,
        obj: *mut u8,
        target: &D,
    ) -> Option<ScanResult> {
        let found = unsafe { self.get_field(obj, target) }?;
        let depth = found.path.len().saturating_sub(1);
        scanner.seed_walk(obj, found.index, found.layer_start, depth);
        let walked = if found.tag.is_complex() {
            unsafe { scan_complex(target, scanner, dispatch, found.addr) }
        } else {
            let field = Field {
                addr: found.addr,
                tag: found.tag,
                len: found.len,
                mlen: found.mlen,
                name: found.name,
                index: found.index,
            };
            scanner.var_index += 1;
            dispatch.field(scanner, &field)
        };
        Some(walked)
    }
}

fn resolved<'s, D: Descriptor<'s>>(
    desc: &D,
    addr: *mut u8,
    index: usize,
    layer_start: usize,
    path: &SmallVec<[usize; 4]>,
) -> ResolvedField<'s> {
    ResolvedField {
        addr,
        tag: desc.tag(),
        len: desc.len(),
        mlen: desc.mlen(),
        name: desc.name(),
        index,
        layer_start,
        path: path.clone(),
    }
}

unsafe fn find_in_layer<'s, D: Descriptor<'s>>(
    schema: &Schema<'s, D>,
    obj: *mut u8,
    target: &D,
    var_index: &mut usize,
    layer_start: usize,
    path: &mut SmallVec<[usize; 4]>,
) -> Option<ResolvedField<'s>> {
    let arch = Arch::HOST;
    match schema.format() {
        Format::Replay(fields) => {
            let mut cursor = 0;
            for (pos, desc) in fields.iter().enumerate() {
                cursor = layout::align_up(cursor, layout::natural_align(arch, desc));
                let addr = unsafe { obj.add(cursor) };
                if let Some(found) =
                    unsafe { probe(desc, pos, addr, target, var_index, layer_start, path) }
                {
                    return Some(found);
                }
                cursor += layout::occupied(arch, desc);
            }
            None
        }
        Format::Offset(fields) => {
            for (pos, desc) in fields.iter().enumerate() {
                let addr = unsafe { obj.add(desc.offset()) };
                if let Some(found) =
                    unsafe { probe(desc, pos, addr, target, var_index, layer_start, path) }
                {
                    return Some(found);
                }
            }
            None
        }
        // bare-tag entries have no descriptor identity to match
        Format::Primary(_) => None,
    }
}

/// Checks one layer entry against the target, descending into complex
/// fields, and keeps the leaf count in step with a full walk.
unsafe fn probe<'s, D: Descriptor<'s>>(
    desc: &D,
    pos: usize,
    addr: *mut u8,
    target: &D,
    var_index: &mut usize,
    layer_start: usize,
    path: &mut SmallVec<[usize; 4]>,
) -> Option<ResolvedField<'s>> {
    path.push(pos);
    if std::ptr::eq(desc, target) {
        let found = resolved(desc, addr, *var_index, layer_start, path);
        path.pop();
        return Some(found);
    }
    let found = if desc.tag().is_complex() {
        unsafe { find_in_complex(desc, addr, target, var_index, path) }
    } else {
        *var_index += 1;
        None
    };
    path.pop();
    found
}

unsafe fn find_in_complex<'s, D: Descriptor<'s>>(
    desc: &D,
    addr: *mut u8,
    target: &D,
    var_index: &mut usize,
    path: &mut SmallVec<[usize; 4]>,
) -> Option<ResolvedField<'s>> {
    let nested = desc.nested()?;
    match desc.tag().category() {
        Category::Scalar => {
            let entry = *var_index;
            unsafe { find_in_layer(nested, addr, target, var_index, entry, path) }
        }
        Category::Pointer => {
            let elem = unsafe { addr.cast::<*mut u8>().read_unaligned() };
            let entry = *var_index;
            unsafe { find_in_layer(nested, elem, target, var_index, entry, path) }
        }
        Category::Array => {
            let stride = size::normal_size(Arch::HOST, nested);
            for i in 0..desc.len() {
                let elem = unsafe { addr.add(i * stride) };
                let entry = *var_index;
                if let Some(found) =
                    unsafe { find_in_layer(nested, elem, target, var_index, entry, path) }
                {
                    return Some(found);
                }
            }
            None
        }
        Category::PointerArray => {
            for i in 0..desc.len() {
                let elem = unsafe { addr.cast::<*mut u8>().add(i).read_unaligned() };
                let entry = *var_index;
                if let Some(found) =
                    unsafe { find_in_layer(nested, elem, target, var_index, entry, path) }
                {
                    return Some(found);
                }
            }
            None
        }
        Category::Array2D => {
            let stride = size::normal_size(Arch::HOST, nested);
            for row in 0..desc.mlen() {
                for col in 0..desc.len() {
                    let elem = unsafe { addr.add((row * desc.len() + col) * stride) };
                    let entry = *var_index;
                    if let Some(found) =
                        unsafe { find_in_layer(nested, elem, target, var_index, entry, path) }
                    {
                        return Some(found);
                    }
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    //! Lookup must agree with a full walk on address, index, and layer
    //! bookkeeping.
    use super::*;
    use crate::schema::{FieldDesc, Primary};

    #[repr(C)]
    struct Inner {
        a: u16,
        b: u16,
    }
    #[repr(C)]
    struct Outer {
        head: u32,
        inner: Inner,
        tail: u8,
    }

    static INNER_FIELDS: [FieldDesc<'static>; 2] = [
        FieldDesc::scalar(Primary::U16).named("a"),
        FieldDesc::scalar(Primary::U16).named("b"),
    ];
    static INNER: Schema<'static> = Schema::replay(&INNER_FIELDS);
    static OUTER_FIELDS: [FieldDesc<'static>; 3] = [
        FieldDesc::scalar(Primary::U32).named("head"),
        FieldDesc::complex(&INNER).named("inner"),
        FieldDesc::scalar(Primary::U8).named("tail"),
    ];
    static OUTER: Schema<'static> = Schema::replay(&OUTER_FIELDS);

    #[test]
    fn nested_descriptors_resolve_with_walk_identical_counters() {
        let mut outer = Outer {
            head: 1,
            inner: Inner { a: 2, b: 3 },
            tail: 4,
        };
        let found = unsafe { OUTER.get_field((&raw mut outer).cast(), &INNER_FIELDS[1]) }
            .expect("descriptor from the graph should resolve");
        assert_eq!(
            found.addr as usize,
            (&raw mut outer.inner.b) as usize,
            "address should match the compiled member address"
        );
        // head(0), a(1), b(2): the layer was entered at index 1
        assert_eq!(found.index, 2, "flattened index should match a full walk");
        assert_eq!(found.layer_start, 1, "layer start is the index at layer entry");
        assert_eq!(
            found.path.as_slice(),
            &[1, 1],
            "path records entry positions per layer"
        );
    }

    #[test]
    fn top_level_fields_resolve_after_the_container() {
        let mut outer = Outer {
            head: 0,
            inner: Inner { a: 0, b: 0 },
            tail: 9,
        };
        let found = unsafe { OUTER.get_field((&raw mut outer).cast(), &OUTER_FIELDS[2]) }
            .expect("trailing field should resolve");
        assert_eq!(
            found.addr as usize,
            (&raw mut outer.tail) as usize,
            "trailing field address should skip the nested aggregate"
        );
        assert_eq!(
            found.index, 3,
            "the nested layer's leaves count toward the flat index"
        );
        assert_eq!(found.layer_start, 0, "top-level fields sit in the root layer");
    }

    #[test]
    fn foreign_descriptors_miss() {
        let mut outer = Outer {
            head: 0,
            inner: Inner { a: 0, b: 0 },
            tail: 0,
        };
        // structurally identical but not part of the schema graph
        let foreign = FieldDesc::scalar(Primary::U32).named("head");
        assert!(
            unsafe { OUTER.get_field((&raw mut outer).cast(), &foreign) }.is_none(),
            "matching is by descriptor identity, not by shape"
        );
    }

    #[test]
    fn array_elements_match_in_the_first_element_only() {
        #[repr(C)]
        struct Pair {
            x: u32,
            y: u32,
        }
        static PAIR_FIELDS: [FieldDesc<'static>; 2] = [
            FieldDesc::scalar(Primary::U32).named("x"),
            FieldDesc::scalar(Primary::U32).named("y"),
        ];
        static PAIR: Schema<'static> = Schema::replay(&PAIR_FIELDS);
        static LIST_FIELDS: [FieldDesc<'static>; 2] = [
            FieldDesc::complex_array(&PAIR, 3).named("pairs"),
            FieldDesc::scalar(Primary::U8).named("count"),
        ];
        static LIST: Schema<'static> = Schema::replay(&LIST_FIELDS);

        #[repr(C)]
        struct List {
            pairs: [Pair; 3],
            count: u8,
        }
        let mut list = List {
            pairs: [
                Pair { x: 1, y: 2 },
                Pair { x: 3, y: 4 },
                Pair { x: 5, y: 6 },
            ],
            count: 3,
        };
        let found = unsafe { LIST.get_field((&raw mut list).cast(), &PAIR_FIELDS[1]) }
            .expect("element member should resolve");
        assert_eq!(
            found.addr as usize,
            (&raw mut list.pairs[0].y) as usize,
            "a shared descriptor resolves in element 0"
        );

        // the trailing count sits after all six element leaves
        let found = unsafe { LIST.get_field((&raw mut list).cast(), &LIST_FIELDS[1]) }
            .expect("trailing field should resolve");
        assert_eq!(found.index, 6, "every element's leaves count toward the index");
    }

    #[test]
    fn bare_tag_entries_resolve_by_tag_byte() {
        #[repr(C)]
        struct Flat {
            id: u32,
            flag: u8,
        }
        static TAGS: [u8; 3] = [
            TypeTag::scalar(Primary::U32).raw(),
            TypeTag::scalar(Primary::U8).raw(),
            TypeTag::END,
        ];
        static FLAT: Schema<'static> = Schema::primary(&TAGS);

        let mut flat = Flat { id: 1, flag: 2 };
        let found = unsafe { FLAT.get_field_tag((&raw mut flat).cast(), &TAGS[1]) }
            .expect("tag byte from the schema should resolve");
        assert_eq!(
            found.addr as usize,
            (&raw mut flat.flag) as usize,
            "bare-tag lookup replays the same layout as the walk"
        );
        assert_eq!(found.index, 1, "bare-tag entries count like leaves");
        assert!(
            unsafe { FLAT.get_field_tag((&raw mut flat).cast(), &TAGS[2]) }.is_none(),
            "the sentinel is not a field"
        );
    }

    #[test]
    fn scan_field_delivers_exactly_the_requested_field() {
        fn record(scanner: &mut Scanner<'_>, field: &Field<'_>) -> ScanResult {
            let entry = (field.index, scanner.depth(), field.addr as usize);
            if let Some(args) = scanner.args.as_deref_mut()
                && let Some(log) = args.downcast_mut::<Vec<(usize, usize, usize)>>()
            {
                log.push(entry);
            }
            Ok(())
        }

        let mut outer = Outer {
            head: 1,
            inner: Inner { a: 2, b: 3 },
            tail: 4,
        };
        let mut log: Vec<(usize, usize, usize)> = Vec::new();
        let mut scanner = Scanner::new().with_args(&mut log);

        // a leaf target is delivered once with its full-walk identity
        let result = unsafe {
            OUTER.scan_field(
                &mut scanner,
                &Dispatch::Callback(record),
                (&raw mut outer).cast(),
                &INNER_FIELDS[1],
            )
        };
        assert_eq!(result, Some(Ok(())), "known targets should traverse");
        assert_eq!(log.len(), 1, "only the requested leaf is delivered");
        assert_eq!(log[0].0, 2, "the delivered index matches a full walk");
        assert_eq!(log[0].1, 1, "depth is seeded to the field's layer");

        // a complex target walks its whole subtree
        log.clear();
        let mut scanner = Scanner::new().with_args(&mut log);
        let result = unsafe {
            OUTER.scan_field(
                &mut scanner,
                &Dispatch::Callback(record),
                (&raw mut outer).cast(),
                &OUTER_FIELDS[1],
            )
        };
        assert_eq!(result, Some(Ok(())), "complex targets should traverse");
        assert_eq!(log.len(), 2, "both nested leaves are delivered");
        assert_eq!(
            log.iter().map(|entry| entry.0).collect::<Vec<_>>(),
            vec![1, 2],
            "nested leaves keep their full-walk indices"
        );

        // the miss needs no log, so the borrow on it can end here
        let foreign = FieldDesc::scalar(Primary::U8);
        let mut scanner = Scanner::new();
        let result = unsafe {
            OUTER.scan_field(
                &mut scanner,
                &Dispatch::Callback(record),
                (&raw mut outer).cast(),
                &foreign,
            )
        };
        assert!(result.is_none(), "unknown targets report a miss, not an error");
    }
}
