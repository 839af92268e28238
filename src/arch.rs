//! Target architecture model: word width, pointer width, and the alignment
//! cap each width imposes on field placement.

/// Word width of the architecture a schema describes.
///
/// Scanning a live object always happens on [`Arch::HOST`]; the other
/// variants exist so size calculations can answer for foreign targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    Bits8,
    Bits16,
    Bits32,
    Bits64,
}

impl Arch {
    #[cfg(target_pointer_width = "64")]
    pub const HOST: Arch = Arch::Bits64;
    #[cfg(target_pointer_width = "32")]
    pub const HOST: Arch = Arch::Bits32;
    #[cfg(target_pointer_width = "16")]
    pub const HOST: Arch = Arch::Bits16;

    pub const fn word_bytes(self) -> usize {
        match self {
            Arch::Bits8 => 1,
            Arch::Bits16 => 2,
            Arch::Bits32 => 4,
            Arch::Bits64 => 8,
        }
    }

    /// Width of a data pointer. 8-bit parts address with 16-bit pointers.
    pub const fn pointer_bytes(self) -> usize {
        match self {
            Arch::Bits8 | Arch::Bits16 => 2,
            Arch::Bits32 => 4,
            Arch::Bits64 => 8,
        }
    }

    /// Caps a field's natural alignment the way the target ABI does: 8-bit
    /// targets have no alignment constraints, 16/32-bit targets never align
    /// past their word, 64-bit targets honor the natural alignment as-is.
    pub const fn align_cap(self, natural: usize) -> usize {
        match self {
            Arch::Bits8 => 1,
            Arch::Bits16 | Arch::Bits32 => {
                let word = self.word_bytes();
                if natural < word { natural } else { word }
            }
            Arch::Bits64 => natural,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Alignment cap rules per architecture width.
    use super::*;

    #[test]
    fn cap_is_identity_on_64_bit() {
        // 64-bit targets keep the natural alignment untouched
        assert_eq!(Arch::Bits64.align_cap(8), 8, "u64 should stay 8-aligned");
        assert_eq!(Arch::Bits64.align_cap(2), 2, "u16 should stay 2-aligned");
    }

    #[test]
    fn cap_clamps_to_word_on_32_bit() {
        // i386-style ABIs align doubles to the 4-byte word
        assert_eq!(
            Arch::Bits32.align_cap(8),
            4,
            "8-byte fields clamp to the 32-bit word"
        );
        assert_eq!(Arch::Bits32.align_cap(2), 2, "small fields keep natural alignment");
    }

    #[test]
    fn cap_collapses_on_8_bit() {
        // 8-bit targets pack everything back to back
        assert_eq!(Arch::Bits8.align_cap(4), 1, "no alignment constraints on 8-bit");
    }

    #[test]
    fn pointer_width_tracks_addressing() {
        assert_eq!(Arch::Bits8.pointer_bytes(), 2, "8-bit parts use 16-bit data pointers");
        assert_eq!(Arch::Bits64.pointer_bytes(), 8, "64-bit pointers are 8 bytes");
    }
}
