//! Control register map for the convolution layer.
//!
//! Three 16-bit configuration words drive a run. Every field is independent:
//! writing one never disturbs its neighbours.
//!
//! ```text
//! Offset  Name    Bits     Field
//! ──────  ──────  ───────  ─────────────
//! 0x00    BCFG1   [7:0]    ENGINE_COUNT
//!                 [12:8]   SHIFT
//! 0x04    BCFG2   [15:0]   MATRIX_SIZE
//! 0x08    CPRM1   [5:0]    STRIDE
//!                 [6]      SAVE_TO_MEM
//! ```
//!
//! Bits outside the defined fields are ignored on write and read back as 0.

// ── Register offsets ─────────────────────────────────────────────────────────

/// Block configuration 1: engine count and output shift.
pub const BCFG1: usize = 0x00;
/// Block configuration 2: input matrix size.
pub const BCFG2: usize = 0x04;
/// Convolution parameters 1: stride and export flag.
pub const CPRM1: usize = 0x08;

/// Width of every configuration register.
pub const REGISTER_WIDTH_BITS: u32 = 16;

// ── Bit-field descriptor ─────────────────────────────────────────────────────

/// A contiguous bit-field inside a register word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitField {
    /// Position of the least significant bit.
    pub offset: u32,
    /// Number of bits.
    pub width: u32,
}

impl BitField {
    /// Describe a field of `width` bits starting at bit `offset`.
    #[must_use]
    pub const fn new(offset: u32, width: u32) -> Self {
        Self { offset, width }
    }

    /// Largest value the field can hold.
    #[must_use]
    pub const fn max_value(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// Mask of the field's bits in place.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        self.max_value() << self.offset
    }

    /// True if `value` is representable without truncation.
    #[must_use]
    pub const fn fits(&self, value: u32) -> bool {
        value <= self.max_value()
    }

    /// Read the field out of `word`.
    #[must_use]
    pub const fn extract(&self, word: u32) -> u32 {
        (word >> self.offset) & self.max_value()
    }

    /// Return `word` with the field replaced by `value` (truncated to width).
    #[must_use]
    pub const fn insert(&self, word: u32, value: u32) -> u32 {
        (word & !self.mask()) | ((value & self.max_value()) << self.offset)
    }
}

// ── Field definitions ────────────────────────────────────────────────────────

/// `BCFG1` fields.
pub mod bcfg1 {
    use super::BitField;

    /// Number of engines taking part in a run.
    pub const ENGINE_COUNT: BitField = BitField::new(0, 8);
    /// Arithmetic right shift applied to every accumulator.
    pub const SHIFT: BitField = BitField::new(8, 5);
    /// All defined bits.
    pub const DEFINED: u32 = ENGINE_COUNT.mask() | SHIFT.mask();
}

/// `BCFG2` fields.
pub mod bcfg2 {
    use super::BitField;

    /// Side length of the square input matrix.
    pub const MATRIX_SIZE: BitField = BitField::new(0, 16);
    /// All defined bits.
    pub const DEFINED: u32 = MATRIX_SIZE.mask();
}

/// `CPRM1` fields.
pub mod cprm1 {
    use super::BitField;

    /// Window step along both axes.
    pub const STRIDE: BitField = BitField::new(0, 6);
    /// Tag every result vector of the run for export.
    pub const SAVE_TO_MEM: BitField = BitField::new(6, 1);
    /// All defined bits.
    pub const DEFINED: u32 = STRIDE.mask() | SAVE_TO_MEM.mask();
}

// ── Bench literals ───────────────────────────────────────────────────────────

/// Register words written by the bring-up bench before its first run.
pub mod bench {
    /// Shift 0, two engines.
    pub const BCFG1: u32 = 0x0002;
    /// 5x5 input.
    pub const BCFG2: u32 = 0x0005;
    /// Stride 1, export every vector.
    pub const CPRM1: u32 = 0x0041;
    /// Matrix size written mid-run to probe configuration cloning.
    pub const BCFG2_MID_RUN: u32 = 0x0010;
}
