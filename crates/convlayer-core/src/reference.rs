//! Software reference convolution.
//!
//! A brute-force valid convolution over a whole matrix, written without the
//! ring buffer or the streaming cursor so it can serve as ground truth for
//! the tick-level core.

use convlayer_chip::geometry::{output_dim, KERNEL_SIZE};

use crate::aggregator::{ResultVector, WindowPosition};
use crate::kernel::KernelWeights;
use crate::matrix::ActivationMatrix;

/// Results of one kernel over every valid window, row-major.
///
/// The shift is applied as floor division by `2^shift`, which is what an
/// arithmetic shift does to a two's complement value.
#[allow(clippy::cast_possible_truncation)]
pub fn reference_convolution(
    matrix: &ActivationMatrix,
    kernel: &KernelWeights,
    stride: usize,
    shift: u32,
) -> Vec<i32> {
    let n = matrix.size();
    let dim = output_dim(n, stride);
    let samples = matrix.samples();
    let divisor = 1i64 << shift.min(62);

    let mut out = Vec::with_capacity(dim * dim);
    for out_row in 0..dim {
        for out_col in 0..dim {
            let (top, left) = (out_row * stride, out_col * stride);
            let mut acc = 0i64;
            for kr in 0..KERNEL_SIZE {
                for kc in 0..KERNEL_SIZE {
                    let sample = samples[(top + kr) * n + left + kc];
                    acc += i64::from(kernel.at(kr, kc)) * i64::from(sample);
                }
            }
            out.push(acc.div_euclid(divisor) as i32);
        }
    }
    out
}

/// Expected result vectors of a run with one kernel per engine.
pub fn reference_vectors(
    matrix: &ActivationMatrix,
    kernels: &[KernelWeights],
    stride: usize,
    shift: u32,
    export: bool,
) -> Vec<ResultVector> {
    let dim = output_dim(matrix.size(), stride);
    let per_engine: Vec<Vec<i32>> = kernels
        .iter()
        .map(|kernel| reference_convolution(matrix, kernel, stride, shift))
        .collect();

    (0..dim * dim)
        .map(|sequence| ResultVector {
            values: per_engine.iter().map(|results| results[sequence]).collect(),
            position: WindowPosition {
                row: sequence / dim,
                col: sequence % dim,
            },
            sequence,
            export,
        })
        .collect()
}
