//! Square activation matrices.
//!
//! Samples are stored as raw bytes (`Bytes`, cheap to clone between a
//! driver and an oracle) and viewed as `i8` without copying.

use bytes::Bytes;

use crate::error::{ConvError, Result};

/// An `n x n` matrix of signed 8-bit samples, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationMatrix {
    size: usize,
    data: Bytes,
}

impl ActivationMatrix {
    /// Matrix from raw two's complement bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMatrix` unless `data` holds exactly `size²` bytes.
    pub fn from_bytes(size: usize, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() != size * size {
            return Err(ConvError::invalid_matrix(format!(
                "{} bytes for a {size}x{size} matrix",
                data.len()
            )));
        }
        Ok(Self { size, data })
    }

    /// Matrix from signed samples.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMatrix` unless `samples` holds exactly `size²` values.
    pub fn from_samples(size: usize, samples: &[i8]) -> Result<Self> {
        let raw: &[u8] = bytemuck::cast_slice(samples);
        Self::from_bytes(size, Bytes::copy_from_slice(raw))
    }

    /// Matrix from wider integers, each wrapped to 8 bits the way a
    /// narrower bus truncates it (`200` becomes `-56`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidMatrix` unless `values` holds exactly `size²` values.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_wrapping(size: usize, values: &[i32]) -> Result<Self> {
        let raw: Vec<u8> = values.iter().map(|&v| v as u8).collect();
        Self::from_bytes(size, raw)
    }

    /// Matrix whose sample at (row, col) is `f(row, col)`.
    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> i8) -> Self {
        let samples: Vec<i8> = (0..size * size)
            .map(|index| f(index / size, index % size))
            .collect();
        let raw: &[u8] = bytemuck::cast_slice(&samples);
        Self {
            size,
            data: Bytes::copy_from_slice(raw),
        }
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a 0x0 matrix.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Samples in streaming (row-major) order.
    pub fn samples(&self) -> &[i8] {
        bytemuck::cast_slice::<u8, i8>(&self.data)
    }

    /// Sample at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Option<i8> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.samples().get(row * self.size + col).copied()
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }
}
