//! Structured dump of a live object: one line per leaf field, complex
//! fields rendered as indented blocks. Built on the compact dispatch form,
//! so it doubles as a worked example of writing handlers.

use std::fmt::Write as _;

use crate::dispatch::{Dispatch, ScanFns};
use crate::error::{ScanError, ScanResult};
use crate::schema::{Category, Descriptor, Primary, Schema};
use crate::walk::scan::{Field, Scanner};

/// Renders every field of the object at `obj` into a readable listing.
///
/// Unnamed fields are labeled `f<index>` by their flattened leaf index.
///
/// # Safety
/// Same contract as [`Schema::scan`]: `obj` must be laid out as `schema`
/// describes on the host, with every reachable pointer field valid.
pub unsafe fn dump<'s, D: Descriptor<'s>>(
    schema: &Schema<'s, D>,
    obj: *mut u8,
) -> Result<String, ScanError> {
    const FNS: ScanFns = {
        let mut fns = ScanFns::uniform(print_leaf);
        fns.complex_begin = Some(print_begin);
        fns.complex_end = Some(print_end);
        fns
    };
    let mut state = PrintState { out: String::new() };
    let mut scanner = Scanner::new().with_args(&mut state);
    unsafe { schema.scan(&mut scanner, &Dispatch::Compact(&FNS), obj)? };
    Ok(state.out)
}

struct PrintState {
    out: String,
}

fn label(field: &Field<'_>) -> String {
    match field.name {
        Some(name) => name.to_string(),
        None => format!("f{}", field.index),
    }
}

fn push_line(scanner: &mut Scanner<'_>, line: &str) {
    if let Some(args) = scanner.args.as_deref_mut()
        && let Some(state) = args.downcast_mut::<PrintState>()
    {
        state.out.push_str(line);
        state.out.push('\n');
    }
}

// The handlers below read object memory; they only ever run under the
// safety contract dump's caller accepted.

fn print_leaf(scanner: &mut Scanner<'_>, field: &Field<'_>) -> ScanResult {
    let mut line = format!("{}{}: ", "  ".repeat(scanner.depth()), label(field));
    match field.tag.category() {
        Category::Scalar => {
            if let Some(value) = unsafe { field.value() } {
                let _ = write!(line, "{value}");
            }
        }
        Category::Pointer => {
            let target = unsafe { field.pointer_at(0) };
            let _ = write!(line, "0x{:x}", target as usize);
        }
        Category::Array if field.tag.primary() == Primary::Char => {
            let mut text = String::new();
            for i in 0..field.len {
                let byte = unsafe { field.addr.add(i).read() };
                if byte == 0 {
                    break;
                }
                text.push(byte as char);
            }
            let _ = write!(line, "\"{}\"", text.escape_default());
        }
        Category::Array => {
            line.push('[');
            for i in 0..field.len {
                if i > 0 {
                    line.push_str(", ");
                }
                if let Some(value) = unsafe { field.value_at(i) } {
                    let _ = write!(line, "{value}");
                }
            }
            line.push(']');
        }
        Category::PointerArray => {
            line.push('[');
            for i in 0..field.len {
                if i > 0 {
                    line.push_str(", ");
                }
                let target = unsafe { field.pointer_at(i) };
                let _ = write!(line, "0x{:x}", target as usize);
            }
            line.push(']');
        }
        Category::Array2D => {
            line.push('[');
            for row in 0..field.mlen {
                if row > 0 {
                    line.push_str(", ");
                }
                line.push('[');
                for col in 0..field.len {
                    if col > 0 {
                        line.push_str(", ");
                    }
                    if let Some(value) = unsafe { field.value_at(row * field.len + col) } {
                        let _ = write!(line, "{value}");
                    }
                }
                line.push(']');
            }
            line.push(']');
        }
    }
    push_line(scanner, &line);
    Ok(())
}

fn print_begin(scanner: &mut Scanner<'_>, field: &Field<'_>) -> ScanResult {
    let line = format!("{}{} {{", "  ".repeat(scanner.depth()), label(field));
    push_line(scanner, &line);
    Ok(())
}

fn print_end(scanner: &mut Scanner<'_>, _field: &Field<'_>) -> ScanResult {
    let line = format!("{}}}", "  ".repeat(scanner.depth()));
    push_line(scanner, &line);
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Rendering of scalars, strings, arrays, and nested blocks.
    use super::*;
    use crate::schema::FieldDesc;

    #[test]
    fn scalars_and_strings_render_on_their_own_lines() {
        #[repr(C)]
        struct Record {
            id: u32,
            name: [u8; 8],
            weights: [f32; 3],
        }
        static FIELDS: [FieldDesc<'static>; 3] = [
            FieldDesc::scalar(Primary::U32).named("id"),
            FieldDesc::array(Primary::Char, 8).named("name"),
            FieldDesc::array(Primary::F32, 3).named("weights"),
        ];
        static SCHEMA: Schema<'static> = Schema::replay(&FIELDS);

        let mut record = Record {
            id: 42,
            name: *b"abc\0\0\0\0\0",
            weights: [1.0, 2.5, 3.0],
        };
        let rendered = unsafe { dump(&SCHEMA, (&raw mut record).cast()) }
            .expect("plain records should render");
        assert!(rendered.contains("id: 42"), "scalar line missing: {rendered}");
        assert!(
            rendered.contains("name: \"abc\""),
            "char arrays render as strings up to the terminator: {rendered}"
        );
        assert!(
            rendered.contains("weights: [1, 2.5, 3]"),
            "arrays render bracketed: {rendered}"
        );
    }

    #[test]
    fn nested_blocks_indent_with_depth() {
        #[repr(C)]
        struct Inner {
            v: u16,
        }
        #[repr(C)]
        struct Outer {
            inner: Inner,
        }
        static INNER_FIELDS: [FieldDesc<'static>; 1] =
            [FieldDesc::scalar(Primary::U16).named("v")];
        static INNER: Schema<'static> = Schema::replay(&INNER_FIELDS);
        static OUTER_FIELDS: [FieldDesc<'static>; 1] =
            [FieldDesc::complex(&INNER).named("inner")];
        static OUTER: Schema<'static> = Schema::replay(&OUTER_FIELDS);

        let mut outer = Outer {
            inner: Inner { v: 5 },
        };
        let rendered = unsafe { dump(&OUTER, (&raw mut outer).cast()) }
            .expect("nested records should render");
        assert_eq!(
            rendered, "inner {\n  v: 5\n}\n",
            "block edges wrap the indented member"
        );
    }

    #[test]
    fn unnamed_fields_fall_back_to_their_index() {
        static FIELDS: [FieldDesc<'static>; 1] = [FieldDesc::scalar(Primary::U8)];
        static SCHEMA: Schema<'static> = Schema::replay(&FIELDS);
        let mut byte = 7u8;
        let rendered = unsafe { dump(&SCHEMA, (&raw mut byte) as *mut u8) }
            .expect("single byte should render");
        assert_eq!(rendered, "f0: 7\n", "fallback label uses the leaf index");
    }
}
