use std::{error::Error, fmt};

pub type ScanResult = Result<(), ScanError>;

/// Failures surfaced by scan, lookup, and buffer helpers.
///
/// Schema/object shape mismatches and cyclic schema graphs are caller
/// contract violations and are never detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    /// A dispatch handler asked for the walk to stop. The code is
    /// caller-defined and propagated verbatim to the original caller.
    Halted {
        code: u32,
    },
    /// A raw tag byte does not decode to a known category/primary pair.
    InvalidTag {
        raw: u8,
    },
    /// A bare-tag schema contains a complex tag; bare tags cannot carry a
    /// nested schema reference.
    ComplexInPrimary,
    /// A complex descriptor has no nested schema attached.
    MissingSchema,
    BufferOverflow {
        needed: usize,
        remaining: usize,
    },
    BufferUnderflow {
        needed: usize,
        remaining: usize,
    },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Halted { code } => write!(f, "scan halted by handler with code {code}"),
            ScanError::InvalidTag { raw } => write!(f, "0x{raw:02X} is not a valid type tag"),
            ScanError::ComplexInPrimary => {
                write!(f, "bare-tag schemas cannot describe complex fields")
            }
            ScanError::MissingSchema => {
                write!(f, "complex field descriptor has no nested schema")
            }
            ScanError::BufferOverflow { needed, remaining } => write!(
                f,
                "buffer overflow: {needed} bytes requested, {remaining} remaining"
            ),
            ScanError::BufferUnderflow { needed, remaining } => write!(
                f,
                "buffer underflow: {needed} bytes requested, {remaining} remaining"
            ),
        }
    }
}

impl Error for ScanError {}
