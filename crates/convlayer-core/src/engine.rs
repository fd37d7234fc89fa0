//! Convolution engines.
//!
//! An engine is one multiply-accumulate unit: nine weights, the run's shift,
//! and nothing else. It never owns window data; the controller hands every
//! engine the same `&WindowBuffer` in the same tick, so the result vector
//! lines up positionally across engines.
//!
//! ## Arithmetic
//!
//! ```text
//! acc    = Σ kernel[i] · window[i]      i = 0..9, i32
//! result = acc >> shift                 arithmetic (floor toward -∞)
//! ```
//!
//! |acc| ≤ 9·128·128 = 147,456, so the i32 accumulator cannot overflow.

use convlayer_chip::geometry::KERNEL_TAPS;
use tracing::trace;

use crate::kernel::KernelWeights;
use crate::window::WindowBuffer;

/// One multiply-accumulate engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvolutionEngine {
    index: usize,
    kernel: KernelWeights,
    shift: u32,
}

impl ConvolutionEngine {
    /// Engine `index` running `kernel` with the given output shift.
    pub fn new(index: usize, kernel: KernelWeights, shift: u32) -> Self {
        Self {
            index,
            kernel,
            shift,
        }
    }

    /// Position in the result vector.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Weights loaded for this run.
    pub fn kernel(&self) -> &KernelWeights {
        &self.kernel
    }

    /// Output shift for this run.
    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Un-shifted dot product with the window ending at the newest sample.
    pub fn accumulate(&self, window: &WindowBuffer) -> i32 {
        (0..KERNEL_TAPS)
            .map(|tap| i32::from(self.kernel.taps()[tap]) * i32::from(window.tap(tap)))
            .sum()
    }

    /// Shifted result for the window ending at the newest sample.
    pub fn evaluate(&self, window: &WindowBuffer) -> i32 {
        let acc = self.accumulate(window);
        let result = apply_shift(acc, self.shift);
        trace!("engine {}: acc={acc} result={result}", self.index);
        result
    }
}

/// Arithmetic right shift; shifts of 31 or more saturate to 0 / -1.
pub fn apply_shift(acc: i32, shift: u32) -> i32 {
    acc >> shift.min(31)
}

/// Evaluate every engine against the same window, in engine order.
///
/// `out` is cleared and refilled so its storage is reused tick to tick.
pub fn evaluate_lockstep(engines: &[ConvolutionEngine], window: &WindowBuffer, out: &mut Vec<i32>) {
    out.clear();
    out.extend(engines.iter().map(|engine| engine.evaluate(window)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_window_5x5() -> WindowBuffer {
        let mut buf = WindowBuffer::new();
        buf.prime(5);
        for k in 0..13i8 {
            buf.push(k);
        }
        buf
    }

    #[test]
    fn dot_product_of_first_window() {
        let buf = first_window_5x5();
        let e0 = ConvolutionEngine::new(0, KernelWeights::new([1, 2, 3, 4, 5, 6, 7, 8, 9]), 0);
        let e1 = ConvolutionEngine::new(
            1,
            KernelWeights::new([10, -10, 20, -20, 30, -30, 40, -40, 50]),
            0,
        );
        assert_eq!(e0.evaluate(&buf), 366);
        assert_eq!(e1.evaluate(&buf), 460);
    }

    #[test]
    fn shift_floors_toward_negative_infinity() {
        assert_eq!(apply_shift(366, 1), 183);
        assert_eq!(apply_shift(-7, 1), -4);
        assert_eq!(apply_shift(-1, 5), -1);
        assert_eq!(apply_shift(5, 40), 0);
        assert_eq!(apply_shift(-5, 40), -1);
    }

    #[test]
    fn extreme_magnitudes_do_not_overflow() {
        let mut buf = WindowBuffer::new();
        buf.prime(3);
        for _ in 0..9 {
            buf.push(i8::MIN);
        }
        let e = ConvolutionEngine::new(0, KernelWeights::new([i8::MIN; KERNEL_TAPS]), 0);
        assert_eq!(e.accumulate(&buf), 147_456);

        let e = ConvolutionEngine::new(0, KernelWeights::new([i8::MAX; KERNEL_TAPS]), 0);
        assert_eq!(e.accumulate(&buf), -9 * 127 * 128);
    }

    #[test]
    fn lockstep_preserves_engine_order() {
        let buf = first_window_5x5();
        let engines: Vec<_> = (0..4i8)
            .map(|i| {
                let mut taps = [0i8; KERNEL_TAPS];
                taps[8] = i + 1;
                ConvolutionEngine::new(usize::try_from(i).unwrap(), KernelWeights::new(taps), 0)
            })
            .collect();
        let mut out = vec![99; 10];
        evaluate_lockstep(&engines, &buf, &mut out);
        assert_eq!(out, vec![12, 24, 36, 48]);
    }
}
