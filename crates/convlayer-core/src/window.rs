//! Shared sliding window over the activation stream.
//!
//! A ring buffer of the most recent `n·2 + 3` samples. The newest sample is
//! always the bottom-right of the window the controller is about to
//! evaluate, so every tap is a fixed distance back from the write head (see
//! [`convlayer_chip::geometry::tap_age`]). Engines only ever get `&self`.

use convlayer_chip::geometry::{tap_age, window_capacity, KERNEL_TAPS};

/// Ring buffer of recent activation samples.
#[derive(Debug, Clone, Default)]
pub struct WindowBuffer {
    samples: Vec<i8>,
    head: usize,
    filled: usize,
    matrix_size: usize,
}

impl WindowBuffer {
    /// Empty, unprimed buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Size and empty the buffer for an `n x n` input.
    ///
    /// Storage is reused across runs; it only grows.
    pub fn prime(&mut self, matrix_size: usize) {
        self.samples.clear();
        self.samples.resize(window_capacity(matrix_size), 0);
        self.head = 0;
        self.filled = 0;
        self.matrix_size = matrix_size;
    }

    /// Drop every buffered sample, keeping the current sizing.
    pub fn clear(&mut self) {
        self.samples.fill(0);
        self.head = 0;
        self.filled = 0;
    }

    /// Append the newest sample, evicting the oldest once full.
    pub fn push(&mut self, sample: i8) {
        let capacity = self.samples.len();
        if capacity == 0 {
            return;
        }
        self.samples[self.head] = sample;
        self.head = (self.head + 1) % capacity;
        self.filled = (self.filled + 1).min(capacity);
    }

    /// Sample `age` positions before the newest (0 = newest).
    pub fn recent(&self, age: usize) -> Option<i8> {
        if age >= self.filled {
            return None;
        }
        let capacity = self.samples.len();
        Some(self.samples[(self.head + capacity - 1 - age) % capacity])
    }

    /// Kernel tap `tap` (0 = top-left, 8 = bottom-right) of the window
    /// ending at the newest sample. Taps not yet streamed read as 0.
    pub fn tap(&self, tap: usize) -> i8 {
        self.recent(tap_age(tap, self.matrix_size)).unwrap_or(0)
    }

    /// The whole window, row-major.
    pub fn window(&self) -> [i8; KERNEL_TAPS] {
        std::array::from_fn(|tap| self.tap(tap))
    }

    /// Samples the buffer retains.
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Samples currently buffered.
    pub fn len(&self) -> usize {
        self.filled
    }

    /// True if nothing has been pushed since the last prime/clear.
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Matrix size the buffer was primed for.
    pub fn matrix_size(&self) -> usize {
        self.matrix_size
    }
}
