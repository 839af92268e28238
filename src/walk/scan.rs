//! Field traversal over live objects: resolves each field's address with the
//! host layout rules and hands it to the caller's dispatch tables.

use std::any::Any;
use std::fmt;

use bitflags::bitflags;

use crate::arch::Arch;
use crate::dispatch::Dispatch;
use crate::error::{ScanError, ScanResult};
use crate::schema::{Category, Descriptor, Format, Primary, Schema, TypeTag};

use super::{layout, size};

bitflags! {
    /// Loop-control requests a handler may raise mid-walk.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct BreakFlags: u8 {
        /// Leave the current complex-array element loop.
        const LAYER = 1;
        /// Leave both loops of a 2-D complex array.
        const LAYER_2D = 1 << 1;
    }
}

/// Mutable traversal state threaded through every handler call.
///
/// Carries the caller's context (`args`), an optional byte buffer for
/// serializer handlers, and the walk counters: a flattened leaf index, the
/// index the current layer started at, and the nesting depth.
pub struct Scanner<'a> {
    /// Caller context, surfaced to every handler. Downcast to recover it.
    pub args: Option<&'a mut dyn Any>,
    buffer: Option<&'a mut [u8]>,
    cursor: usize,
    main_obj: *mut u8,
    pub(crate) var_index: usize,
    layer_start: usize,
    depth: usize,
    flags: BreakFlags,
}

impl<'a> Scanner<'a> {
    pub fn new() -> Scanner<'a> {
        Scanner {
            args: None,
            buffer: None,
            cursor: 0,
            main_obj: std::ptr::null_mut(),
            var_index: 0,
            layer_start: 0,
            depth: 0,
            flags: BreakFlags::empty(),
        }
    }

    pub fn with_args(mut self, args: &'a mut dyn Any) -> Scanner<'a> {
        self.args = Some(args);
        self
    }

    pub fn with_buffer(mut self, buffer: &'a mut [u8]) -> Scanner<'a> {
        self.buffer = Some(buffer);
        self
    }

    /// Root address of the object the walk started from.
    pub fn main_obj(&self) -> *mut u8 {
        self.main_obj
    }

    /// Flattened index of the next leaf field. Complex containers do not
    /// consume an index; their nested leaves do.
    pub fn var_index(&self) -> usize {
        self.var_index
    }

    /// Value of [`Scanner::var_index`] when the current layer was entered.
    pub fn layer_start(&self) -> usize {
        self.layer_start
    }

    /// Complex nesting depth, 0 at the root layer.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Byte position within the attached buffer.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        match &self.buffer {
            Some(buffer) => buffer.len() - self.cursor,
            None => 0,
        }
    }

    /// Appends `bytes` at the cursor.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> ScanResult {
        let remaining = self.remaining();
        if bytes.len() > remaining {
            return Err(ScanError::BufferOverflow {
                needed: bytes.len(),
                remaining,
            });
        }
        if let Some(buffer) = self.buffer.as_deref_mut() {
            buffer[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
            self.cursor += bytes.len();
        }
        Ok(())
    }

    /// Consumes the next `N` bytes at the cursor.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ScanError> {
        let remaining = self.remaining();
        if N > remaining {
            return Err(ScanError::BufferUnderflow {
                needed: N,
                remaining,
            });
        }
        let mut out = [0u8; N];
        if let Some(buffer) = self.buffer.as_deref() {
            out.copy_from_slice(&buffer[self.cursor..self.cursor + N]);
            self.cursor += N;
        }
        Ok(out)
    }

    /// Consumes the next `len` bytes into `out`.
    pub fn read_into(&mut self, out: &mut [u8]) -> ScanResult {
        let remaining = self.remaining();
        if out.len() > remaining {
            return Err(ScanError::BufferUnderflow {
                needed: out.len(),
                remaining,
            });
        }
        if let Some(buffer) = self.buffer.as_deref() {
            out.copy_from_slice(&buffer[self.cursor..self.cursor + out.len()]);
            self.cursor += out.len();
        }
        Ok(())
    }

    /// Requests that the enclosing complex-array element loop stop after the
    /// current element.
    pub fn break_layer(&mut self) {
        self.flags.insert(BreakFlags::LAYER);
    }

    /// Requests that both loops of the enclosing 2-D complex array stop.
    pub fn break_layer_2d(&mut self) {
        self.flags.insert(BreakFlags::LAYER_2D);
    }

    fn reset_walk(&mut self, obj: *mut u8) {
        self.seed_walk(obj, 0, 0, 0);
    }

    /// Primes the walk counters for a traversal that starts mid-object.
    pub(crate) fn seed_walk(
        &mut self,
        obj: *mut u8,
        var_index: usize,
        layer_start: usize,
        depth: usize,
    ) {
        self.main_obj = obj;
        self.var_index = var_index;
        self.layer_start = layer_start;
        self.depth = depth;
        self.flags = BreakFlags::empty();
    }
}

impl Default for Scanner<'_> {
    fn default() -> Self {
        Scanner::new()
    }
}

/// One resolved field, handed to dispatch handlers.
#[derive(Clone, Copy, Debug)]
pub struct Field<'s> {
    /// Address of the field within the scanned object.
    pub addr: *mut u8,
    pub tag: TypeTag,
    /// Element count for array shapes; inner (per-row) extent for 2-D
    /// arrays.
    pub len: usize,
    /// Outer (row) extent for 2-D arrays.
    pub mlen: usize,
    pub name: Option<&'s str>,
    /// Flattened leaf index at the moment of delivery.
    pub index: usize,
}

impl Field<'_> {
    /// Reads the field as `T`.
    ///
    /// # Safety
    /// `addr` must point to at least `size_of::<T>()` initialized bytes that
    /// are valid at `T`.
    pub unsafe fn read<T: Copy>(&self) -> T {
        unsafe { self.addr.cast::<T>().read_unaligned() }
    }

    /// Overwrites the field with `value`.
    ///
    /// # Safety
    /// `addr` must point to at least `size_of::<T>()` writable bytes.
    pub unsafe fn write<T>(&self, value: T) {
        unsafe { self.addr.cast::<T>().write_unaligned(value) }
    }

    /// Reads the scalar value of the field, `None` for complex fields.
    ///
    /// # Safety
    /// `addr` must point to an initialized value of the tagged primary type.
    pub unsafe fn value(&self) -> Option<Value> {
        unsafe { read_value(self.tag.primary(), self.addr) }
    }

    /// Reads element `i` of an array field, `None` for complex elements.
    ///
    /// # Safety
    /// `addr` must point to at least `i + 1` initialized elements of the
    /// tagged primary type.
    pub unsafe fn value_at(&self, i: usize) -> Option<Value> {
        let primary = self.tag.primary();
        let elem = unsafe { self.addr.add(i * layout::primary_size(primary)) };
        unsafe { read_value(primary, elem) }
    }

    /// Reads pointer slot `i` of a pointer or pointer-array field.
    ///
    /// # Safety
    /// `addr` must point to at least `i + 1` initialized pointer slots.
    pub unsafe fn pointer_at(&self, i: usize) -> *mut u8 {
        unsafe { self.addr.cast::<*mut u8>().add(i).read_unaligned() }
    }
}

/// A scalar read out of a scanned field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Char(u8),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Char(c) if c.is_ascii_graphic() || c == b' ' => {
                write!(f, "'{}'", c as char)
            }
            Value::Char(c) => write!(f, "'\\x{c:02X}'"),
            Value::U8(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
        }
    }
}

unsafe fn read_value(primary: Primary, addr: *const u8) -> Option<Value> {
    Some(match primary {
        Primary::Char => Value::Char(unsafe { addr.read_unaligned() }),
        Primary::U8 => Value::U8(unsafe { addr.read_unaligned() }),
        Primary::I8 => Value::I8(unsafe { addr.cast::<i8>().read_unaligned() }),
        Primary::U16 => Value::U16(unsafe { addr.cast::<u16>().read_unaligned() }),
        Primary::I16 => Value::I16(unsafe { addr.cast::<i16>().read_unaligned() }),
        Primary::U32 => Value::U32(unsafe { addr.cast::<u32>().read_unaligned() }),
        Primary::I32 => Value::I32(unsafe { addr.cast::<i32>().read_unaligned() }),
        Primary::U64 => Value::U64(unsafe { addr.cast::<u64>().read_unaligned() }),
        Primary::I64 => Value::I64(unsafe { addr.cast::<i64>().read_unaligned() }),
        Primary::F32 => Value::F32(unsafe { addr.cast::<f32>().read_unaligned() }),
        Primary::F64 => Value::F64(unsafe { addr.cast::<f64>().read_unaligned() }),
        Primary::Complex => return None,
    })
}

impl<'s, D: Descriptor<'s>> Schema<'s, D> {
    /// Walks every field of the object at `obj`, delivering each leaf to
    /// `dispatch` in declaration order and descending into complex fields.
    ///
    /// # Safety
    /// `obj` must point to a live object laid out exactly as this schema
    /// describes on the host, and every pointer field reached by the walk
    /// must hold a valid pointer to its described target.
    pub unsafe fn scan(
        &self,
        scanner: &mut Scanner<'_>,
        dispatch: &Dispatch<'_>,
        obj: *mut u8,
    ) -> ScanResult {
        scanner.reset_walk(obj);
        unsafe { scan_layer(self, scanner, dispatch, obj) }
    }
}

pub(crate) unsafe fn scan_layer<'s, D: Descriptor<'s>>(
    schema: &Schema<'s, D>,
    scanner: &mut Scanner<'_>,
    dispatch: &Dispatch<'_>,
    obj: *mut u8,
) -> ScanResult {
    match schema.format() {
        Format::Replay(fields) => unsafe { scan_replay(fields, scanner, dispatch, obj) },
        Format::Primary(tags) => unsafe { scan_primary(tags, scanner, dispatch, obj) },
        Format::Offset(fields) => unsafe { scan_offset(fields, scanner, dispatch, obj) },
    }
}

unsafe fn scan_replay<'s, D: Descriptor<'s>>(
    fields: &[D],
    scanner: &mut Scanner<'_>,
    dispatch: &Dispatch<'_>,
    obj: *mut u8,
) -> ScanResult {
    let arch = Arch::HOST;
    let mut cursor = 0;
    for desc in fields {
        cursor = layout::align_up(cursor, layout::natural_align(arch, desc));
        let addr = unsafe { obj.add(cursor) };
        unsafe { emit(desc, scanner, dispatch, addr)? };
        cursor += layout::occupied(arch, desc);
    }
    Ok(())
}

unsafe fn scan_offset<'s, D: Descriptor<'s>>(
    fields: &[D],
    scanner: &mut Scanner<'_>,
    dispatch: &Dispatch<'_>,
    obj: *mut u8,
) -> ScanResult {
    for desc in fields {
        let addr = unsafe { obj.add(desc.offset()) };
        unsafe { emit(desc, scanner, dispatch, addr)? };
    }
    Ok(())
}

unsafe fn scan_primary(
    tags: &[u8],
    scanner: &mut Scanner<'_>,
    dispatch: &Dispatch<'_>,
    obj: *mut u8,
) -> ScanResult {
    let arch = Arch::HOST;
    let mut cursor = 0;
    for &raw in tags {
        if raw == TypeTag::END {
            break;
        }
        let Some(tag) = TypeTag::from_raw(raw) else {
            return Err(ScanError::InvalidTag { raw });
        };
        if tag.is_complex() {
            return Err(ScanError::ComplexInPrimary);
        }
        // array shapes need a length and bare tags carry none
        if !matches!(tag.category(), Category::Scalar | Category::Pointer) {
            return Err(ScanError::InvalidTag { raw });
        }
        cursor = layout::align_up(cursor, layout::tag_align(arch, tag));
        let field = Field {
            addr: unsafe { obj.add(cursor) },
            tag,
            len: 0,
            mlen: 0,
            name: None,
            index: scanner.var_index,
        };
        scanner.var_index += 1;
        dispatch.field(scanner, &field)?;
        cursor += layout::tag_occupied(arch, tag);
    }
    Ok(())
}

unsafe fn emit<'s, D: Descriptor<'s>>(
    desc: &D,
    scanner: &mut Scanner<'_>,
    dispatch: &Dispatch<'_>,
    addr: *mut u8,
) -> ScanResult {
    let tag = desc.tag();
    if tag.is_complex() {
        return unsafe { scan_complex(desc, scanner, dispatch, addr) };
    }
    let field = Field {
        addr,
        tag,
        len: desc.len(),
        mlen: desc.mlen(),
        name: desc.name(),
        index: scanner.var_index,
    };
    scanner.var_index += 1;
    dispatch.field(scanner, &field)
}

pub(crate) unsafe fn scan_complex<'s, D: Descriptor<'s>>(
    desc: &D,
    scanner: &mut Scanner<'_>,
    dispatch: &Dispatch<'_>,
    addr: *mut u8,
) -> ScanResult {
    let nested = desc.nested().ok_or(ScanError::MissingSchema)?;
    let field = Field {
        addr,
        tag: desc.tag(),
        len: desc.len(),
        mlen: desc.mlen(),
        name: desc.name(),
        index: scanner.var_index,
    };
    match desc.tag().category() {
        Category::Scalar => unsafe { complex_element(nested, scanner, dispatch, &field, addr) },
        Category::Pointer => {
            let target = unsafe { addr.cast::<*mut u8>().read_unaligned() };
            unsafe { complex_element(nested, scanner, dispatch, &field, target) }
        }
        Category::Array => {
            let stride = size::normal_size(Arch::HOST, nested);
            for i in 0..desc.len() {
                let elem = unsafe { addr.add(i * stride) };
                unsafe { complex_element(nested, scanner, dispatch, &field, elem)? };
                if scanner.flags.contains(BreakFlags::LAYER) {
                    scanner.flags.remove(BreakFlags::LAYER);
                    break;
                }
            }
            Ok(())
        }
        Category::PointerArray => {
            for i in 0..desc.len() {
                let target = unsafe { addr.cast::<*mut u8>().add(i).read_unaligned() };
                unsafe { complex_element(nested, scanner, dispatch, &field, target)? };
                if scanner.flags.contains(BreakFlags::LAYER) {
                    scanner.flags.remove(BreakFlags::LAYER);
                    break;
                }
            }
            Ok(())
        }
        Category::Array2D => {
            let stride = size::normal_size(Arch::HOST, nested);
            for row in 0..desc.mlen() {
                for col in 0..desc.len() {
                    let elem = unsafe { addr.add((row * desc.len() + col) * stride) };
                    unsafe { complex_element(nested, scanner, dispatch, &field, elem)? };
                    if scanner
                        .flags
                        .intersects(BreakFlags::LAYER | BreakFlags::LAYER_2D)
                    {
                        break;
                    }
                }
                scanner.flags.remove(BreakFlags::LAYER);
                if scanner.flags.contains(BreakFlags::LAYER_2D) {
                    scanner.flags.remove(BreakFlags::LAYER_2D);
                    break;
                }
            }
            Ok(())
        }
    }
}

/// Brackets one nested element with begin/end and walks its layer with the
/// layer counters saved and restored around the descent.
unsafe fn complex_element<'s, D: Descriptor<'s>>(
    nested: &Schema<'s, D>,
    scanner: &mut Scanner<'_>,
    dispatch: &Dispatch<'_>,
    field: &Field<'_>,
    elem: *mut u8,
) -> ScanResult {
    dispatch.complex_begin(scanner, field)?;
    let saved = scanner.layer_start;
    scanner.layer_start = scanner.var_index;
    scanner.depth += 1;
    let walked = unsafe { scan_layer(nested, scanner, dispatch, elem) };
    scanner.depth -= 1;
    scanner.layer_start = saved;
    walked?;
    dispatch.complex_end(scanner, field)
}
