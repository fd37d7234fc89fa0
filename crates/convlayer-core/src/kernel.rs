//! Kernel weights and the control-plane kernel bank.
//!
//! Each engine slot holds nine signed 8-bit coefficients in row-major order:
//!
//! ```text
//! [0] top-left     [1] top-middle     [2] top-right
//! [3] middle-left  [4] center         [5] middle-right
//! [6] bottom-left  [7] bottom-middle  [8] bottom-right
//! ```
//!
//! The bank is what the control plane writes. Engines take their own copy
//! when a run is loaded, so the bank may be rewritten while a run is in
//! flight without disturbing it.

use convlayer_chip::geometry::{KERNEL_SIZE, KERNEL_TAPS, MAX_ENGINES};

use crate::error::{ConvError, Result};

/// Nine signed coefficients of one 3x3 kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KernelWeights([i8; KERNEL_TAPS]);

impl KernelWeights {
    /// Kernel from coefficients in row-major order.
    pub const fn new(taps: [i8; KERNEL_TAPS]) -> Self {
        Self(taps)
    }

    /// Kernel from raw register bytes (two's complement, `0xF6` = -10).
    ///
    /// # Errors
    ///
    /// Returns `InvalidKernel` unless exactly nine bytes are given.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let signed: &[i8] = bytemuck::cast_slice(raw);
        Self::from_slice(signed)
    }

    /// Kernel from a slice of coefficients.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKernel` unless exactly nine coefficients are given.
    pub fn from_slice(taps: &[i8]) -> Result<Self> {
        let taps: [i8; KERNEL_TAPS] = taps
            .try_into()
            .map_err(|_| ConvError::InvalidKernel { len: taps.len() })?;
        Ok(Self(taps))
    }

    /// Coefficients in row-major order.
    pub const fn taps(&self) -> &[i8; KERNEL_TAPS] {
        &self.0
    }

    /// Coefficient at (row, col), both in `0..3`.
    pub fn at(&self, row: usize, col: usize) -> i8 {
        self.0[row * KERNEL_SIZE + col]
    }

    /// Raw register bytes.
    pub fn to_bytes(&self) -> [u8; KERNEL_TAPS] {
        let mut raw = [0u8; KERNEL_TAPS];
        raw.copy_from_slice(bytemuck::cast_slice::<i8, u8>(&self.0));
        raw
    }
}

impl From<[i8; KERNEL_TAPS]> for KernelWeights {
    fn from(taps: [i8; KERNEL_TAPS]) -> Self {
        Self::new(taps)
    }
}

/// Kernel weights for every engine slot.
#[derive(Debug, Clone)]
pub struct KernelBank {
    slots: [KernelWeights; MAX_ENGINES],
}

impl Default for KernelBank {
    fn default() -> Self {
        Self {
            slots: [KernelWeights::default(); MAX_ENGINES],
        }
    }
}

impl KernelBank {
    /// Number of engine slots.
    pub const fn capacity(&self) -> usize {
        MAX_ENGINES
    }

    /// Overwrite one slot.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEngine` if `engine` is not a slot index.
    pub fn set(&mut self, engine: usize, weights: KernelWeights) -> Result<()> {
        let slot = self.slots.get_mut(engine).ok_or(ConvError::InvalidEngine {
            index: engine,
            count: MAX_ENGINES,
        })?;
        *slot = weights;
        Ok(())
    }

    /// Weights in one slot.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEngine` if `engine` is not a slot index.
    pub fn get(&self, engine: usize) -> Result<KernelWeights> {
        self.slots
            .get(engine)
            .copied()
            .ok_or(ConvError::InvalidEngine {
                index: engine,
                count: MAX_ENGINES,
            })
    }

    /// The first `count` slots (clamped to the bank size).
    pub fn leading(&self, count: usize) -> &[KernelWeights] {
        &self.slots[..count.min(MAX_ENGINES)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_bytes_are_twos_complement() {
        let raw: [u8; 9] = [0x0A, 0xF6, 0x14, 0xEC, 0x1E, 0xE2, 0x28, 0xD8, 0x32];
        let k = KernelWeights::from_bytes(&raw).unwrap();
        assert_eq!(k.taps(), &[10, -10, 20, -20, 30, -30, 40, -40, 50]);
        assert_eq!(k.to_bytes(), raw);
    }

    #[test]
    fn wrong_length_rejected() {
        assert_eq!(
            KernelWeights::from_slice(&[1, 2, 3]),
            Err(ConvError::InvalidKernel { len: 3 })
        );
        assert!(KernelWeights::from_bytes(&[0u8; 10]).is_err());
    }

    #[test]
    fn at_is_row_major() {
        let k = KernelWeights::new([1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(k.at(0, 0), 1);
        assert_eq!(k.at(1, 1), 5);
        assert_eq!(k.at(2, 0), 7);
        assert_eq!(k.at(2, 2), 9);
    }

    #[test]
    fn bank_slot_bounds() {
        let mut bank = KernelBank::default();
        let k = KernelWeights::new([1; KERNEL_TAPS]);
        bank.set(MAX_ENGINES - 1, k).unwrap();
        assert_eq!(bank.get(MAX_ENGINES - 1).unwrap(), k);
        assert!(matches!(
            bank.set(MAX_ENGINES, k),
            Err(ConvError::InvalidEngine { index: 16, count: 16 })
        ));
        assert_eq!(bank.leading(2).len(), 2);
        assert_eq!(bank.leading(99).len(), MAX_ENGINES);
    }
}
