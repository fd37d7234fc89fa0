//! Kernel and window geometry.
//!
//! The layer only ever runs a 3x3 kernel over a square input with "valid"
//! semantics (no padding). Everything the datapath needs to size its
//! buffers follows from the matrix size and stride.
//!
//! ## Window buffer
//!
//! Samples arrive row-major. When the sample at (r, c) is accepted, the
//! window whose bottom-right corner is (r, c) spans the last three rows, so
//! the oldest tap is `2·n + 2` samples back:
//!
//! ```text
//! capacity = n·(K-1) + K        (n = matrix size, K = 3)
//! ```

/// Side length of the square kernel.
pub const KERNEL_SIZE: usize = 3;

/// Coefficients per kernel.
pub const KERNEL_TAPS: usize = KERNEL_SIZE * KERNEL_SIZE;

/// Engine slots in the kernel bank.
pub const MAX_ENGINES: usize = 16;

/// Bits per activation sample (signed).
pub const SAMPLE_BITS: u32 = 8;

/// Bits per kernel weight (signed).
pub const WEIGHT_BITS: u32 = 8;

/// Largest |sample × weight|: (-128) × (-128).
pub const MAX_ABS_PRODUCT: i64 = 1 << (SAMPLE_BITS - 1 + WEIGHT_BITS - 1);

/// Largest |accumulator| before the shift.
pub const MAX_ABS_ACCUMULATOR: i64 = KERNEL_TAPS as i64 * MAX_ABS_PRODUCT;

/// Samples the window buffer must retain for an `n x n` input.
#[must_use]
pub const fn window_capacity(matrix_size: usize) -> usize {
    matrix_size * (KERNEL_SIZE - 1) + KERNEL_SIZE
}

/// Output rows (and columns) of a valid convolution.
///
/// Zero when no window fits or the stride is zero.
#[must_use]
pub const fn output_dim(matrix_size: usize, stride: usize) -> usize {
    if matrix_size < KERNEL_SIZE || stride == 0 {
        0
    } else {
        (matrix_size - KERNEL_SIZE) / stride + 1
    }
}

/// Result vectors produced by one run.
#[must_use]
pub const fn outputs_per_engine(matrix_size: usize, stride: usize) -> usize {
    let dim = output_dim(matrix_size, stride);
    dim * dim
}

/// How many samples back from the newest one a kernel tap sits.
///
/// Tap 0 is the window's top-left, tap 8 its bottom-right (the newest).
#[must_use]
pub const fn tap_age(tap: usize, matrix_size: usize) -> usize {
    let row = tap / KERNEL_SIZE;
    let col = tap % KERNEL_SIZE;
    (KERNEL_SIZE - 1 - row) * matrix_size + (KERNEL_SIZE - 1 - col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_capacity_covers_oldest_tap() {
        for n in 3..32 {
            assert_eq!(window_capacity(n), tap_age(0, n) + 1);
        }
        assert_eq!(window_capacity(5), 13);
    }

    #[test]
    fn output_grid() {
        assert_eq!(output_dim(5, 1), 3);
        assert_eq!(output_dim(5, 2), 2);
        assert_eq!(output_dim(5, 3), 1);
        assert_eq!(output_dim(6, 2), 2);
        assert_eq!(output_dim(3, 7), 1);
        assert_eq!(outputs_per_engine(5, 1), 9);
        assert_eq!(outputs_per_engine(16, 1), 196);
    }

    #[test]
    fn degenerate_geometry_has_no_windows() {
        assert_eq!(output_dim(2, 1), 0);
        assert_eq!(output_dim(5, 0), 0);
    }

    #[test]
    fn newest_tap_is_bottom_right() {
        assert_eq!(tap_age(KERNEL_TAPS - 1, 5), 0);
        assert_eq!(tap_age(4, 5), 6);
    }

    #[test]
    fn accumulator_fits_i32() {
        // 9 × 128 × 128 = 147,456
        assert_eq!(MAX_ABS_ACCUMULATOR, 147_456);
        assert!(MAX_ABS_ACCUMULATOR < i64::from(i32::MAX));
    }
}
